//! Minimal chat-completions client (OpenAI-compatible; Groq by default).
//!
//! The rest of the backend only sees the `ChatModel` trait: ordered role/content
//! messages plus a generation budget in, generated text out. There is no retry;
//! callers surface failures immediately.
//!
//! NOTE: We never log the API key, and only log short previews of contents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum LlmError {
  #[error("LLM request timed out after {0:?}")]
  Timeout(Duration),

  #[error("LLM transport error: {0}")]
  Transport(String),

  #[error("LLM HTTP {status}: {detail}")]
  Status { status: u16, detail: String },

  #[error("LLM response malformed: {0}")]
  Malformed(String),
}

/// One message of the conversation sent to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
  pub role: String,
  pub content: String,
}

impl ChatTurn {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: "system".into(), content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: "user".into(), content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: "assistant".into(), content: content.into() }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationBudget {
  pub max_tokens: u32,
  pub temperature: f32,
}

impl GenerationBudget {
  pub const CHAT: GenerationBudget = GenerationBudget { max_tokens: 1500, temperature: 0.7 };
  pub const QUIZ: GenerationBudget = GenerationBudget { max_tokens: 2000, temperature: 0.8 };
}

#[async_trait]
pub trait ChatModel: Send + Sync {
  /// Short identifier for logs.
  fn model_name(&self) -> &str;

  async fn complete(&self, messages: &[ChatTurn], budget: GenerationBudget) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct HttpChatModel {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl HttpChatModel {
  /// Build the client if a credential is configured; otherwise return None.
  pub fn from_settings(settings: &Settings) -> Option<Self> {
    let api_key = settings.llm_api_key.clone()?;
    let client = match reqwest::Client::builder().timeout(settings.llm_timeout).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "tutor_backend", error = %e, "Failed to build HTTP client for LLM");
        return None;
      }
    };

    Some(Self {
      client,
      api_key,
      base_url: settings.llm_base_url.trim_end_matches('/').to_string(),
      model: settings.llm_model.clone(),
      timeout: settings.llm_timeout,
    })
  }
}

#[async_trait]
impl ChatModel for HttpChatModel {
  fn model_name(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, messages), fields(model = %self.model, n_messages = messages.len(), max_tokens = budget.max_tokens))]
  async fn complete(&self, messages: &[ChatTurn], budget: GenerationBudget) -> Result<String, LlmError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages,
      temperature: budget.temperature,
      max_tokens: budget.max_tokens,
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "tutor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| self.classify(e))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let detail = extract_api_error(&body).unwrap_or(body);
      error!(status = status.as_u16(), elapsed = ?start.elapsed(), "LLM returned non-success status");
      return Err(LlmError::Status { status: status.as_u16(), detail });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| {
      if e.is_timeout() { LlmError::Timeout(self.timeout) } else { LlmError::Malformed(e.to_string()) }
    })?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "LLM usage");
    }

    let text = first_choice_text(body)?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "LLM response received");
    Ok(text)
  }
}

impl HttpChatModel {
  fn classify(&self, e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
      LlmError::Timeout(self.timeout)
    } else {
      LlmError::Transport(e.to_string())
    }
  }
}

fn first_choice_text(body: ChatCompletionResponse) -> Result<String, LlmError> {
  body.choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty())
    .ok_or_else(|| LlmError::Malformed("response has no choices[0].message.content".into()))
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: &'a [ChatTurn],
  temperature: f32,
  max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
pub mod testing {
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::*;

  /// Replays canned outcomes in order and records every request it sees.
  #[derive(Default)]
  pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    pub seen: Mutex<Vec<(Vec<ChatTurn>, GenerationBudget)>>,
  }

  impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
      Self { replies: Mutex::new(replies.into()), seen: Mutex::new(Vec::new()) }
    }
  }

  #[async_trait]
  impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
      "scripted"
    }

    async fn complete(&self, messages: &[ChatTurn], budget: GenerationBudget) -> Result<String, LlmError> {
      self.seen.lock().unwrap().push((messages.to_vec(), budget));
      self.replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(LlmError::Transport("no scripted reply left".into())))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_serializes_openai_shape() {
    let msgs = vec![ChatTurn::system("sys"), ChatTurn::user("salut")];
    let req = ChatCompletionRequest { model: "m", messages: &msgs, temperature: 0.7, max_tokens: 1500 };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["model"], "m");
    assert_eq!(v["max_tokens"], 1500);
    assert_eq!(v["messages"][1]["role"], "user");
    assert_eq!(v["messages"][1]["content"], "salut");
  }

  #[test]
  fn first_choice_is_trimmed() {
    let body: ChatCompletionResponse =
      serde_json::from_str(r#"{"choices":[{"message":{"content":"  Bonjour !\n"}}]}"#).unwrap();
    assert_eq!(first_choice_text(body).unwrap(), "Bonjour !");
  }

  #[test]
  fn missing_content_is_malformed() {
    let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
    assert!(matches!(first_choice_text(body), Err(LlmError::Malformed(_))));
    let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
    assert!(matches!(first_choice_text(body), Err(LlmError::Malformed(_))));
  }

  #[test]
  fn api_error_message_is_extracted() {
    assert_eq!(
      extract_api_error(r#"{"error":{"message":"Invalid API Key","type":"auth"}}"#).as_deref(),
      Some("Invalid API Key")
    );
    assert_eq!(extract_api_error("gateway down"), None);
  }

  #[test]
  fn no_credential_means_no_client() {
    let settings = Settings { llm_api_key: None, ..Settings::default() };
    assert!(HttpChatModel::from_settings(&settings).is_none());
    let settings = Settings { llm_api_key: Some("k".into()), ..Settings::default() };
    let m = HttpChatModel::from_settings(&settings).unwrap();
    assert_eq!(m.model_name(), "llama-3.3-70b-versatile");
  }
}
