// Rust Agent MI6: chat model adapter for the MI6 conversations gateway

pub mod config;
mod models;

// Re-export main components for external use
pub use config::Mi6Config;
pub use models::{
    ChatModel, ChatMessage, ChatMessageContent, ChatCompletion, TokenUsage, PromptSegment,
    Mi6ChatModel, CompletionResult, CompletionError, RetryPolicy, DEFAULT_MAX_TOKENS,
    MAX_RETRY_ATTEMPTS, MIN_WAIT, MAX_WAIT,
};

// Export anyhow error handling library to ensure consistent error handling for third-party users
pub use anyhow;
