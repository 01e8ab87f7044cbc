//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, QuizContent, Subject};

fn default_student_level() -> String {
  "lycée".into()
}

fn default_difficulty() -> String {
  "moyen".into()
}

fn default_num_questions() -> u32 {
  5
}

#[derive(Debug, Deserialize)]
pub struct ChatIn {
  pub message: String,
  pub subject: String,
  #[serde(default = "default_student_level")]
  pub student_level: String,
}
#[derive(Debug, Serialize)]
pub struct ChatOut {
  pub response: String,
  pub subject: Subject,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct QuizGenerateIn {
  pub subject: String,
  pub topic: String,
  #[serde(default = "default_difficulty")]
  pub difficulty: String,
  #[serde(default = "default_num_questions")]
  pub num_questions: u32,
}
#[derive(Debug, Serialize)]
pub struct QuizGenerateOut {
  pub quiz_id: i64,
  pub quiz: QuizContent,
  pub subject: Subject,
}

#[derive(Debug, Deserialize)]
pub struct QuizSubmitIn {
  pub quiz_id: i64,
  pub answers: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
  pub limit: Option<u32>,
}
#[derive(Debug, Serialize)]
pub struct HistoryOut {
  pub history: Vec<ChatMessage>,
  pub subject: Subject,
}

#[derive(Debug, Serialize)]
pub struct MessageOut {
  pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WelcomeOut {
  pub message: &'static str,
  pub version: &'static str,
  pub subjects: [Subject; 2],
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
