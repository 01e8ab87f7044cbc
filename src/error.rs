//! Error taxonomy surfaced at the HTTP boundary.
//!
//! Every variant maps to a status code and a JSON body
//! `{"detail": "...", "kind": "..."}` so clients can tell a down upstream
//! from one that returned garbage.

use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::llm::LlmError;
use crate::quiz::QuizError;
use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("LLM API key is not configured (set LLM_API_KEY or GROQ_API_KEY)")]
  Configuration,

  #[error("LLM API error: {0}")]
  Upstream(String),

  #[error("invalid LLM response: {0}")]
  MalformedUpstream(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Validation(String),

  #[error("storage error: {0}")]
  Storage(String),
}

impl AppError {
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Configuration => "configuration",
      AppError::Upstream(_) => "upstream",
      AppError::MalformedUpstream(_) => "malformed_upstream",
      AppError::NotFound(_) => "not_found",
      AppError::Validation(_) => "validation",
      AppError::Storage(_) => "storage",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Configuration | AppError::Upstream(_) | AppError::MalformedUpstream(_) | AppError::Storage(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl From<LlmError> for AppError {
  fn from(e: LlmError) -> Self {
    match e {
      LlmError::Malformed(_) => AppError::MalformedUpstream(e.to_string()),
      LlmError::Timeout(_) | LlmError::Transport(_) | LlmError::Status { .. } => AppError::Upstream(e.to_string()),
    }
  }
}

impl From<StorageError> for AppError {
  fn from(e: StorageError) -> Self {
    AppError::Storage(e.to_string())
  }
}

impl From<QuizError> for AppError {
  fn from(e: QuizError) -> Self {
    match e {
      QuizError::NotFound(_) => AppError::NotFound(e.to_string()),
      QuizError::AnswerCount { .. } | QuizError::AnswerOutOfRange { .. } => AppError::Validation(e.to_string()),
      QuizError::InvalidGenerated(_) => AppError::MalformedUpstream(e.to_string()),
      QuizError::CorruptQuiz { .. } => AppError::Storage(e.to_string()),
      QuizError::Storage(inner) => inner.into(),
    }
  }
}

impl From<JsonRejection> for AppError {
  fn from(r: JsonRejection) -> Self {
    AppError::Validation(r.body_text())
  }
}

impl From<QueryRejection> for AppError {
  fn from(r: QueryRejection) -> Self {
    AppError::Validation(r.body_text())
  }
}

#[derive(Serialize)]
struct ErrorBody {
  detail: String,
  kind: &'static str,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "tutor_backend", kind = self.kind(), error = %self, "Request failed");
    } else {
      warn!(target: "tutor_backend", kind = self.kind(), error = %self, "Request rejected");
    }
    (status, Json(ErrorBody { detail: self.to_string(), kind: self.kind() })).into_response()
  }
}
