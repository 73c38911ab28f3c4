// Model module definition
mod chat;
mod error;
mod message;
mod mi6;
mod retry;

// Re-export module content
pub use chat::{ChatModel, ChatCompletion};
pub use error::CompletionError;
pub use message::{ChatMessage, ChatMessageContent, PromptSegment, TokenUsage};
pub use mi6::{CompletionResult, Mi6ChatModel, DEFAULT_MAX_TOKENS};
pub use retry::{RetryPolicy, MAX_RETRY_ATTEMPTS, MAX_WAIT, MIN_WAIT};
