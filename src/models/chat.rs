// Chat model interface and related structure definitions
use anyhow::Error;
use crate::models::message::{ChatMessage, TokenUsage};

// Simplified chat completion structure
#[derive(Debug)]
pub struct ChatCompletion {
    pub message: ChatMessage,
    pub usage: Option<TokenUsage>,
    pub model_name: String,
}

// Chat model interface
pub trait ChatModel: Send + Sync {
    // Basic model information
    fn model_name(&self) -> Option<&str> {
        None
    }

    // Endpoint the model talks to
    fn base_url(&self) -> String;

    // Core method: handle chat messages
    fn invoke(&self, messages: Vec<ChatMessage>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<ChatCompletion, Error>> + Send + '_>>;
}
