use crate::error::{Result, RfqError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for extraction requests.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged turn of the extraction conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Boundary to the generative text service.
///
/// The service is an untrusted black box: implementations return a single
/// text blob per call and make no promise about its shape. The repair loop
/// owns all interpretation of the reply. Implementations that cannot
/// currently authenticate report `is_configured() == false` so the session
/// can fail fast without a network call.
#[allow(async_fn_in_trait)]
pub trait ChatService {
    fn is_configured(&self) -> bool {
        true
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Chat-completions client. Decoding is pinned deterministic (temperature 0)
/// so retries differ only through the appended correction turns.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Reads `OPENAI_API_KEY`. A missing key yields an unconfigured client
    /// rather than an error; the session checks before its first attempt.
    pub fn from_env() -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantReply,
}

#[derive(Deserialize)]
struct AssistantReply {
    content: Option<String>,
}

impl ChatService for OpenAiClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        if !self.is_configured() {
            return Err(RfqError::Configuration("OPENAI_API_KEY is not set".into()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RfqError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(RfqError::Transport(format!(
                "chat completion failed (status {status}): {err_text}"
            )));
        }

        let body: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| RfqError::Transport(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RfqError::Transport("model returned no text content".to_string()))?;

        Ok(content.trim().to_string())
    }
}
