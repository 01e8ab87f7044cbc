//! Persistence contracts for the four record collections (chat history,
//! quizzes, quiz results, progress entries) and the `Storage` bundle handed to
//! each component.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
  ActivityType, ChatMessage, ProgressEntry, Quiz, QuizContent, QuizResult, RecentQuiz, Role, Subject,
};

pub mod sqlite;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
  #[error("not found")]
  NotFound,

  #[error("connection error: {0}")]
  Connection(String),

  #[error("serialization error: {0}")]
  Serialization(String),
}

/// Chat transcript per subject. Append-only apart from bulk clear.
#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
  /// Append one message, stamped with the current time.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` if the row cannot be written.
  async fn append_message(&self, subject: Subject, role: Role, content: &str) -> Result<i64, StorageError>;

  /// The last `limit` messages of `subject`, oldest first.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` on query or decoding failure.
  async fn recent_messages(&self, subject: Subject, limit: u32) -> Result<Vec<ChatMessage>, StorageError>;

  /// Delete every message of `subject`; returns the number of rows removed.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` if the delete fails.
  async fn clear_subject(&self, subject: Subject) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
  /// Persist a generated quiz and return its id.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` if the quiz cannot be encoded or stored.
  async fn insert_quiz(&self, subject: Subject, topic: &str, content: &QuizContent) -> Result<i64, StorageError>;

  /// Fetch a quiz by id.
  ///
  /// # Errors
  ///
  /// Returns `StorageError::NotFound` if missing, or other storage errors.
  async fn get_quiz(&self, id: i64) -> Result<Quiz, StorageError>;
}

#[async_trait]
pub trait QuizResultRepository: Send + Sync {
  /// Append one graded submission.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` if the row cannot be written (including an unknown quiz id).
  async fn append_result(
    &self,
    quiz_id: i64,
    subject: Subject,
    score: f64,
    correct_answers: u32,
    total_questions: u32,
  ) -> Result<i64, StorageError>;

  /// All results for `subject`, oldest first.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` on query or decoding failure.
  async fn results_for(&self, subject: Subject) -> Result<Vec<QuizResult>, StorageError>;

  /// The `limit` most recent results joined with their quiz topic, newest first.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` on query or decoding failure.
  async fn recent_with_topic(&self, subject: Subject, limit: u32) -> Result<Vec<RecentQuiz>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
  /// Append one point-bearing entry.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` if the row cannot be written.
  async fn append_entry(
    &self,
    subject: Subject,
    activity: ActivityType,
    points: u32,
    details: Option<serde_json::Value>,
  ) -> Result<i64, StorageError>;

  /// Every entry for `subject`, oldest first.
  ///
  /// # Errors
  ///
  /// Returns `StorageError` on query or decoding failure.
  async fn entries_for(&self, subject: Subject) -> Result<Vec<ProgressEntry>, StorageError>;
}

/// Store handles passed explicitly to the components that need them.
#[derive(Clone)]
pub struct Storage {
  pub chat: Arc<dyn ChatHistoryRepository>,
  pub quizzes: Arc<dyn QuizRepository>,
  pub results: Arc<dyn QuizResultRepository>,
  pub progress: Arc<dyn ProgressRepository>,
}

#[cfg(test)]
pub mod testing {
  use super::Storage;

  /// Fresh shared-cache in-memory SQLite store. `name` must be unique per test.
  pub async fn memory_storage(name: &str) -> Storage {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    Storage::sqlite(&url).await.expect("in-memory sqlite")
  }
}
