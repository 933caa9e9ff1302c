//! OpenAI-compatible chat-completions client, implementing `LanguageModelPort`.

use crate::domain::config_validation::{
    DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::domain::error::ShipscopeError;
use crate::ports::config_port::ConfigPort;
use crate::ports::language_model_port::LanguageModelPort;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("shipscope/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct OpenAiAdapter {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiAdapter {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ShipscopeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ShipscopeError::LanguageModel {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Reads `[language_model]`; the API key comes from the environment
    /// variable named by `api_key_env`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShipscopeError> {
        let endpoint = config
            .get_string("language_model", "endpoint")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = config
            .get_string("language_model", "model")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let key_env = config
            .get_string("language_model", "api_key_env")
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let timeout_secs = config
            .get_int("language_model", "timeout_secs", DEFAULT_TIMEOUT_SECS)
            .max(1) as u64;

        let api_key = std::env::var(&key_env).map_err(|_| ShipscopeError::LanguageModel {
            reason: format!("environment variable {key_env} is not set"),
        })?;

        Self::new(endpoint, model, api_key, Duration::from_secs(timeout_secs))
    }
}

fn request_body<'a>(model: &'a str, system: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
    }
}

/// First choice's content from a chat-completions response body.
fn parse_reply(body: &str) -> Result<String, ShipscopeError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ShipscopeError::MalformedResponse {
            reason: format!("unreadable chat response: {e}"),
        })?;

    if let Some(error) = response.error {
        return Err(ShipscopeError::LanguageModel {
            reason: error.message,
        });
    }

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ShipscopeError::MalformedResponse {
            reason: "response has no message content".into(),
        })
}

impl LanguageModelPort for OpenAiAdapter {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ShipscopeError> {
        log::debug!("POST {} (model {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, system, prompt))
            .send()
            .map_err(|e| ShipscopeError::LanguageModel {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| ShipscopeError::LanguageModel {
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            let detail = parse_reply(&body)
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(ShipscopeError::LanguageModel {
                reason: format!("HTTP {status} {detail}").trim_end().to_string(),
            });
        }
        parse_reply(&body)
    }
}
