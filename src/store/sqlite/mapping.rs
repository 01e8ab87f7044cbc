use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use crate::domain::{ActivityType, ChatMessage, ProgressEntry, Quiz, QuizContent, QuizResult, RecentQuiz, Role, Subject};
use crate::store::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
  StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_to_i64(v: u32) -> i64 {
  i64::from(v)
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
  u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn subject(row: &SqliteRow) -> Result<Subject, StorageError> {
  let s: String = row.try_get("subject").map_err(ser)?;
  s.parse::<Subject>().map_err(ser)
}

pub(crate) fn map_chat_row(row: &SqliteRow) -> Result<ChatMessage, StorageError> {
  let role_str: String = row.try_get("role").map_err(ser)?;
  let role = Role::parse(&role_str).ok_or_else(|| StorageError::Serialization(format!("invalid role: {role_str}")))?;
  Ok(ChatMessage {
    role,
    content: row.try_get("content").map_err(ser)?,
    timestamp: row.try_get::<DateTime<Utc>, _>("timestamp").map_err(ser)?,
  })
}

pub(crate) fn encode_quiz_content(content: &QuizContent) -> Result<String, StorageError> {
  serde_json::to_string(content).map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
  let raw: String = row.try_get("quiz_data").map_err(ser)?;
  let content: QuizContent = serde_json::from_str(&raw).map_err(ser)?;
  Ok(Quiz {
    id: row.try_get("id").map_err(ser)?,
    subject: subject(row)?,
    topic: row.try_get("topic").map_err(ser)?,
    content,
    created_at: row.try_get("created_at").map_err(ser)?,
  })
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<QuizResult, StorageError> {
  Ok(QuizResult {
    id: row.try_get("id").map_err(ser)?,
    quiz_id: row.try_get("quiz_id").map_err(ser)?,
    subject: subject(row)?,
    score: row.try_get("score").map_err(ser)?,
    correct_answers: i64_to_u32("correct_answers", row.try_get("correct_answers").map_err(ser)?)?,
    total_questions: i64_to_u32("total_questions", row.try_get("total_questions").map_err(ser)?)?,
    completed_at: row.try_get("completed_at").map_err(ser)?,
  })
}

pub(crate) fn map_recent_row(row: &SqliteRow) -> Result<RecentQuiz, StorageError> {
  Ok(RecentQuiz {
    score: row.try_get("score").map_err(ser)?,
    completed_at: row.try_get("completed_at").map_err(ser)?,
    topic: row.try_get("topic").map_err(ser)?,
  })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressEntry, StorageError> {
  let kind: String = row.try_get("activity_type").map_err(ser)?;
  let activity_type =
    ActivityType::parse(&kind).ok_or_else(|| StorageError::Serialization(format!("invalid activity_type: {kind}")))?;
  let details = row
    .try_get::<Option<String>, _>("details")
    .map_err(ser)?
    .map(|d| serde_json::from_str::<serde_json::Value>(&d))
    .transpose()
    .map_err(ser)?;
  Ok(ProgressEntry {
    id: row.try_get("id").map_err(ser)?,
    subject: subject(row)?,
    activity_type,
    points: i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
    details,
    timestamp: row.try_get("timestamp").map_err(ser)?,
  })
}
