// Message type definitions
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use serde_json::Value;

// Message content structure
#[derive(Clone, Debug)]
pub struct ChatMessageContent {
    pub content: String,
    pub name: Option<String>,
    pub additional_kwargs: HashMap<String, Value>,
}

impl ChatMessageContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            name: None,
            additional_kwargs: HashMap::new(),
        }
    }
}

// Simplified message type system (aligned with langchain-core)
#[derive(Clone, Debug)]
pub enum ChatMessage {
    System(ChatMessageContent),
    Human(ChatMessageContent),
    AIMessage(ChatMessageContent),
    ToolMessage(ChatMessageContent),
}

impl ChatMessage {
    /// Role label used by agent prompts for this message
    pub fn role(&self) -> &'static str {
        match self {
            ChatMessage::System(_) => "system",
            ChatMessage::Human(_) => "user",
            ChatMessage::AIMessage(_) => "assistant",
            ChatMessage::ToolMessage(_) => "tool",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System(c)
            | ChatMessage::Human(c)
            | ChatMessage::AIMessage(c)
            | ChatMessage::ToolMessage(c) => &c.content,
        }
    }
}

/// One role-tagged piece of an agent prompt, e.g. `{"role":"system","content":"..."}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: String,
    pub content: String,
}

impl PromptSegment {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

impl From<&ChatMessage> for PromptSegment {
    fn from(message: &ChatMessage) -> Self {
        PromptSegment::new(message.role(), message.content())
    }
}

impl From<ChatMessage> for PromptSegment {
    fn from(message: ChatMessage) -> Self {
        PromptSegment::from(&message)
    }
}

// Token usage statistics
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}
