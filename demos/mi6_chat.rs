// MI6 gateway chat example
//
// MI6_AUTH_TOKEN=... cargo run --example mi6_chat -- "Where was Intel founded?"
// Optional: MI6_CONFIG=path/to/mi6.toml, MI6_MODEL, MI6_TEMPERATURE, MI6_ENDPOINT
use std::path::PathBuf;
use log::{error, info, LevelFilter};
use rust_agent_mi6::{Mi6ChatModel, Mi6Config, PromptSegment};

#[tokio::main]
async fn main() -> Result<(), rust_agent_mi6::anyhow::Error> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config_path = std::env::var("MI6_CONFIG").ok().map(PathBuf::from);
    let config = Mi6Config::load(config_path.as_deref())?;
    let model = Mi6ChatModel::from_config(config)?;
    info!("Using {} with model {}", model.source(), model.model());

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let question = if question.is_empty() {
        "Where was Intel founded?".to_string()
    } else {
        question
    };

    let segments = vec![
        PromptSegment::system("You are a concise assistant."),
        PromptSegment::user(question),
    ];

    match model.complete(&segments).await {
        Ok(result) => {
            if let Some(id) = result.conversation_id() {
                info!("Conversation: {}", id);
            }
            println!("{}", result.content);
        }
        Err(e) => {
            error!("Completion failed (retryable: {}): {}", e.is_retryable(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
