// MI6 gateway model implementation
//
// Request body:
//   {"query": "...", "use_case": "generic", "temperature": 0.5,
//    "inference_model": "azure.openai.gpt.4", "stream": false,
//    "token_limit": 600, "tags": []}
//
// Response body (only message.assistant is relied upon):
//   {"conversation_id": "...",
//    "message": {"message_id": "...", "human": "...", "assistant": "...",
//                "inference_settings": {...}, "timestamp": 1713349390,
//                "sources": [], "feedback": null}}
use super::chat::{ChatCompletion, ChatModel};
use super::error::CompletionError;
use super::message::{ChatMessage, ChatMessageContent, PromptSegment, TokenUsage};
use super::retry::RetryPolicy;
use crate::config::{Mi6Config, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, DEFAULT_USE_CASE};
use anyhow::Error;
use log::{debug, error, info};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_MAX_TOKENS: u32 = 4000;
const SOURCE: &str = "MI6 API";
const SEGMENT_SEPARATOR: &str = ". ";

#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    query: String,
    use_case: &'a str,
    temperature: f32,
    inference_model: &'a str,
    stream: bool,
    token_limit: u32,
    tags: &'a [String],
}

/// A successful gateway completion
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// Full decoded response body
    pub response: Value,
    /// Assistant reply text
    pub content: String,
}

impl CompletionResult {
    /// Token usage if the gateway filled in `inference_settings`
    pub fn usage(&self) -> Option<TokenUsage> {
        let settings = message_object(&self.response)?.get("inference_settings")?;
        let prompt_tokens = settings.get("input_token")?.as_u64()? as usize;
        let completion_tokens = settings.get("output_token")?.as_u64()? as usize;
        Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        })
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.response.get("conversation_id").and_then(|v| v.as_str())
    }
}

fn message_object(body: &Value) -> Option<&Value> {
    body.get("message")
        .filter(|m| m.is_object())
        .or_else(|| body.get("last_message"))
}

/// Chat model backed by the MI6 conversations gateway
#[derive(Clone)]
pub struct Mi6ChatModel {
    client: Client,
    auth_token: String,
    endpoint: String,
    model: String,
    temperature: f32,
    use_case: String,
    tags: Vec<String>,
    forward_tags: bool,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Mi6ChatModel {
    /// Create a new adapter with default model, temperature and use case
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth_token: auth_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            use_case: DEFAULT_USE_CASE.to_string(),
            tags: Vec::new(),
            forward_tags: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    /// Build an adapter from validated configuration
    pub fn from_config(config: Mi6Config) -> Result<Self, Error> {
        config.validate()?;
        let timeout = config.timeout();
        let retry = config.retry_policy();
        Ok(Self {
            client: Client::new(),
            auth_token: config.auth_token,
            endpoint: config.endpoint,
            model: config.model,
            temperature: config.temperature,
            use_case: config.use_case,
            tags: config.tags,
            forward_tags: config.forward_tags,
            timeout,
            retry,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set temperature, clamped to [0, 1]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = if temperature.is_nan() { DEFAULT_TEMPERATURE } else { temperature.clamp(0.0, 1.0) };
        self
    }

    pub fn with_use_case(mut self, use_case: impl Into<String>) -> Self {
        self.use_case = use_case.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Send the configured tags instead of an empty list
    pub fn with_forward_tags(mut self, forward_tags: bool) -> Self {
        self.forward_tags = forward_tags;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Per-request timeout, applied on top of any client-level timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn source(&self) -> &'static str {
        SOURCE
    }

    pub fn api_key(&self) -> &str {
        &self.auth_token
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn use_case(&self) -> &str {
        &self.use_case
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Always true: the gateway offers no key verification call
    pub fn verify_access_key(&self) -> bool {
        true
    }

    /// Placeholder list: the gateway offers no model listing call
    pub fn models(&self) -> Vec<String> {
        vec!["models".to_string()]
    }

    /// Collate role-tagged segments into the single query string the gateway accepts.
    ///
    /// Content holding both `{` and `}` is JSON-string escaped (without the outer
    /// quotes) so embedded structured text stays on one line.
    pub fn compose_prompt(segments: &[PromptSegment]) -> String {
        segments
            .iter()
            .map(|segment| {
                let content = &segment.content;
                if content.contains('{') && content.contains('}') {
                    escape_json_text(content)
                } else {
                    content.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }

    /// Complete with the default token limit
    pub async fn complete(&self, segments: &[PromptSegment]) -> Result<CompletionResult, CompletionError> {
        self.complete_with_limit(segments, DEFAULT_MAX_TOKENS).await
    }

    pub async fn complete_with_limit(
        &self,
        segments: &[PromptSegment],
        max_tokens: u32,
    ) -> Result<CompletionResult, CompletionError> {
        let result = self.try_complete(segments, max_tokens).await;
        if let Err(e) = &result {
            error!("MI6 completion failed ({} segments, model {}): {}", segments.len(), self.model, e);
        }
        result
    }

    async fn try_complete(
        &self,
        segments: &[PromptSegment],
        max_tokens: u32,
    ) -> Result<CompletionResult, CompletionError> {
        if max_tokens == 0 {
            return Err(CompletionError::InvalidRequest("token_limit must be positive".to_string()));
        }

        let tags: &[String] = if self.forward_tags { &self.tags } else { &[] };
        let request = CompletionRequest {
            query: Self::compose_prompt(segments),
            use_case: &self.use_case,
            temperature: self.temperature,
            inference_model: &self.model,
            stream: false,
            token_limit: max_tokens,
            tags,
        };
        debug!("MI6 request: query of {} chars, token_limit {}", request.query.len(), max_tokens);

        let body = self.retry.run(|| self.send(&request)).await?;
        let response = parse_body(&body)?;
        let content = message_object(&response)
            .and_then(|m| m.get("assistant"))
            .and_then(|a| a.as_str())
            .ok_or(CompletionError::MissingField("message.assistant"))?
            .to_string();

        info!("MI6 completion received: {} chars", content.len());
        Ok(CompletionResult { response, content })
    }

    async fn send(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
        info!("Sending MI6 request to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Http { status, body: text });
        }
        debug!("MI6 raw response: {}", text);
        Ok(text)
    }
}

// JSON string literal of `text` without its enclosing quotes, non-ASCII as \uXXXX
fn escape_json_text(text: &str) -> String {
    let quoted = match serde_json::to_string(text) {
        Ok(quoted) => quoted,
        Err(_) => return text.to_string(),
    };
    let inner = &quoted[1..quoted.len() - 1];
    let mut escaped = String::with_capacity(inner.len());
    let mut units = [0u16; 2];
    for c in inner.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}

// Decode the body, tolerating an SSE-style `data:` prefix
fn parse_body(body: &str) -> Result<Value, CompletionError> {
    let trimmed = body.trim();
    let json = trimmed.strip_prefix("data:").map(str::trim_start).unwrap_or(trimmed);
    serde_json::from_str(json).map_err(|e| CompletionError::InvalidResponse(e.to_string()))
}

impl ChatModel for Mi6ChatModel {
    fn model_name(&self) -> Option<&str> {
        Some(&self.model)
    }

    fn base_url(&self) -> String {
        self.endpoint.clone()
    }

    fn invoke(&self, messages: Vec<ChatMessage>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<ChatCompletion, Error>> + Send + '_>> {
        Box::pin(async move {
            let segments: Vec<PromptSegment> = messages.iter().map(PromptSegment::from).collect();
            let result = self.complete(&segments).await?;
            let usage = result.usage();
            Ok(ChatCompletion {
                message: ChatMessage::AIMessage(ChatMessageContent::new(result.content)),
                usage,
                model_name: self.model.clone(),
            })
        })
    }
}
