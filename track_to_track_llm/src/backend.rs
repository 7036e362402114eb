// Completion backends: the seam between the suggester and an LM service.
//
// `CompletionBackend` is the trait the rest of the workspace talks to.
// `HttpCompletionBackend` implements it against an OpenAI-compatible
// chat-completions endpoint:
//
//   POST {base_url}/chat/completions
//   Authorization: Bearer <api key>
//   {"model": ..., "messages": [system, user], "max_tokens": ..., "temperature": ...}
//
// and returns `choices[0].message.content`. HTTP is done with blocking
// `ureq`; callers that must not block run it through `SuggestionTask`.
//
// Every failure maps to a `SuggestError`, all of which are recoverable and
// meant to be shown to the user. A missing credential is reported before
// any network activity. The credential itself is wrapped in `ApiKey`, whose
// `Debug` output is redacted so it cannot leak into logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::prompt::IdeaPrompt;

/// Environment variable consulted for the credential when none is given
/// explicitly.
pub const API_KEY_ENV: &str = "TRACK_TO_TRACK_API_KEY";

/// Longest slice of an error body kept in `SuggestError::Http`.
const MAX_ERROR_BODY: usize = 200;

/// Why a suggestion could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestError {
    #[error("no API key provided; set TRACK_TO_TRACK_API_KEY or pass one explicitly")]
    MissingCredential,
    #[error("the API rejected the credential (HTTP {0})")]
    Unauthorized(u16),
    #[error("the API quota or rate limit was exceeded (HTTP 429)")]
    QuotaExceeded,
    #[error("the API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response from the API: {0}")]
    MalformedResponse(String),
    #[error("the API returned an empty suggestion")]
    EmptyResponse,
    #[error("the suggestion worker stopped without a result")]
    TaskAborted,
}

/// Anything that can turn a prompt into suggestion text.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &IdeaPrompt) -> Result<String, SuggestError>;
}

/// A runtime-supplied API credential. Never persisted; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, or `None` if it is empty or whitespace.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ApiKey(trimmed.to_string()))
        }
    }

    /// Read the key from `TRACK_TO_TRACK_API_KEY`.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV).ok().and_then(ApiKey::new)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Endpoint and generation settings for `HttpCompletionBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestConfig {
    /// Base URL without the trailing `/chat/completions`.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Connect + read timeout for a single HTTP call.
    pub request_timeout: Duration,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        SuggestConfig {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: 300,
            temperature: 0.8,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions client over blocking HTTP.
pub struct HttpCompletionBackend {
    config: SuggestConfig,
    api_key: Option<ApiKey>,
    agent: ureq::Agent,
}

impl HttpCompletionBackend {
    pub fn new(config: SuggestConfig, api_key: Option<ApiKey>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .build();
        HttpCompletionBackend {
            config,
            api_key,
            agent,
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl CompletionBackend for HttpCompletionBackend {
    fn complete(&self, prompt: &IdeaPrompt) -> Result<String, SuggestError> {
        let api_key = self.api_key.as_ref().ok_or(SuggestError::MissingCredential)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: Some(prompt.system_text().into()),
                },
                ChatMessage {
                    role: "user".into(),
                    content: Some(prompt.user_text()),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .agent
            .post(&self.endpoint())
            .set("Authorization", &format!("Bearer {}", api_key.expose()))
            .send_json(&body)
            .map_err(map_ureq_error)?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| SuggestError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(SuggestError::EmptyResponse);
        }
        Ok(text)
    }
}

fn map_ureq_error(err: ureq::Error) -> SuggestError {
    match err {
        ureq::Error::Status(status @ (401 | 403), _) => SuggestError::Unauthorized(status),
        ureq::Error::Status(429, _) => SuggestError::QuotaExceeded,
        ureq::Error::Status(status, response) => {
            let mut body = response.into_string().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| body.is_char_boundary(i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            SuggestError::Http { status, body }
        }
        ureq::Error::Transport(transport) => SuggestError::Network(transport.to_string()),
    }
}
