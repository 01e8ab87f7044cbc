//! Quiz engine: validation of generated quizzes and grading of submissions.
//!
//! Grading is positional: answer `i` is graded against question `i`, and a
//! submission must answer every question exactly once.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::{round2, ActivityType, Quiz, QuizContent, Subject};
use crate::progress::ProgressTracker;
use crate::store::{QuizRepository, QuizResultRepository, StorageError};
use crate::util::extract_json_object;

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Error)]
pub enum QuizError {
  #[error("quiz {0} not found")]
  NotFound(i64),

  #[error("expected {expected} answers, got {got}")]
  AnswerCount { expected: usize, got: usize },

  #[error("answer {answer} for question {question} is out of range (0..{options})")]
  AnswerOutOfRange { question: usize, answer: i64, options: usize },

  #[error("stored quiz {quiz_id} has an invalid correct answer for question {question}")]
  CorruptQuiz { quiz_id: i64, question: usize },

  #[error("generated quiz is invalid: {0}")]
  InvalidGenerated(String),

  #[error(transparent)]
  Storage(StorageError),
}

impl From<StorageError> for QuizError {
  fn from(e: StorageError) -> Self {
    QuizError::Storage(e)
  }
}

/// Qualitative label for a score; same single-slot threshold shape as levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Performance {
  #[serde(rename = "Excellent")]
  Excellent,
  #[serde(rename = "Good")]
  Good,
  #[serde(rename = "Keep practicing")]
  KeepPracticing,
}

impl Performance {
  pub fn from_score(score: f64) -> Self {
    if score >= 80.0 {
      Performance::Excellent
    } else if score >= 60.0 {
      Performance::Good
    } else {
      Performance::KeepPracticing
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionResult {
  pub question: String,
  pub user_answer: String,
  pub correct_answer: String,
  pub is_correct: bool,
  pub explanation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreReport {
  /// Rounded to two decimals.
  pub score: f64,
  pub correct: u32,
  pub total: u32,
  pub results: Vec<QuestionResult>,
  pub performance: Performance,
}

/// Grade `answers` against `quiz` without touching the store.
///
/// The report's `score` is rounded; the unrounded value is returned alongside
/// for persistence.
pub fn grade(quiz: &Quiz, answers: &[i64]) -> Result<(ScoreReport, f64), QuizError> {
  let questions = &quiz.content.questions;
  if answers.len() != questions.len() || questions.is_empty() {
    return Err(QuizError::AnswerCount { expected: questions.len(), got: answers.len() });
  }

  let mut correct = 0u32;
  let mut results = Vec::with_capacity(questions.len());
  for (i, (q, &answer)) in questions.iter().zip(answers).enumerate() {
    let picked = usize::try_from(answer)
      .ok()
      .and_then(|a| q.options.get(a).map(|text| (a, text)))
      .ok_or(QuizError::AnswerOutOfRange { question: i, answer, options: q.options.len() })?;
    let right_text = q
      .options
      .get(q.correct_answer)
      .ok_or(QuizError::CorruptQuiz { quiz_id: quiz.id, question: i })?;

    let is_correct = picked.0 == q.correct_answer;
    if is_correct {
      correct += 1;
    }
    results.push(QuestionResult {
      question: q.question.clone(),
      user_answer: picked.1.clone(),
      correct_answer: right_text.clone(),
      is_correct,
      explanation: q.explanation.clone(),
    });
  }

  let total = results.len() as u32;
  let raw = f64::from(correct) / f64::from(total) * 100.0;
  let report = ScoreReport {
    score: round2(raw),
    correct,
    total,
    results,
    performance: Performance::from_score(raw),
  };
  Ok((report, raw))
}

/// Parse and validate raw model output into quiz content.
///
/// Accepts the object anywhere in the text (fenced or surrounded by prose).
pub fn parse_generated(text: &str) -> Result<QuizContent, QuizError> {
  let raw = extract_json_object(text).map_err(|e| QuizError::InvalidGenerated(e.to_string()))?;
  let content: QuizContent =
    serde_json::from_str(raw).map_err(|e| QuizError::InvalidGenerated(format!("JSON format error: {e}")))?;
  validate_content(&content)?;
  Ok(content)
}

pub fn validate_content(content: &QuizContent) -> Result<(), QuizError> {
  if content.questions.is_empty() {
    return Err(QuizError::InvalidGenerated("no questions".into()));
  }
  for (i, q) in content.questions.iter().enumerate() {
    if q.question.trim().is_empty() {
      return Err(QuizError::InvalidGenerated(format!("question {i} has no text")));
    }
    if q.options.len() != OPTIONS_PER_QUESTION {
      return Err(QuizError::InvalidGenerated(format!(
        "question {i} has {} options, expected {OPTIONS_PER_QUESTION}",
        q.options.len()
      )));
    }
    if q.correct_answer >= q.options.len() {
      return Err(QuizError::InvalidGenerated(format!(
        "question {i} has correct_answer {} out of range",
        q.correct_answer
      )));
    }
  }
  Ok(())
}

/// Scores submissions and records their side effects (result row + progress).
#[derive(Clone)]
pub struct QuizEngine {
  quizzes: Arc<dyn QuizRepository>,
  results: Arc<dyn QuizResultRepository>,
  tracker: ProgressTracker,
}

impl QuizEngine {
  pub fn new(
    quizzes: Arc<dyn QuizRepository>,
    results: Arc<dyn QuizResultRepository>,
    tracker: ProgressTracker,
  ) -> Self {
    Self { quizzes, results, tracker }
  }

  /// Validate and persist a generated quiz; returns its id.
  #[instrument(level = "info", skip(self, content), fields(%subject, n_questions = content.questions.len()))]
  pub async fn create_quiz(&self, subject: Subject, topic: &str, content: &QuizContent) -> Result<i64, QuizError> {
    validate_content(content)?;
    let id = self.quizzes.insert_quiz(subject, topic, content).await?;
    info!(target: "quiz", quiz_id = id, %subject, "Quiz stored");
    Ok(id)
  }

  pub async fn get_quiz(&self, quiz_id: i64) -> Result<Quiz, QuizError> {
    self.quizzes.get_quiz(quiz_id).await.map_err(|e| match e {
      StorageError::NotFound => QuizError::NotFound(quiz_id),
      other => QuizError::Storage(other),
    })
  }

  /// Grade a submission, persist one result, and award quiz-completion points.
  #[instrument(level = "info", skip(self, answers), fields(%quiz_id, n_answers = answers.len()))]
  pub async fn score_submission(&self, quiz_id: i64, answers: &[i64]) -> Result<ScoreReport, QuizError> {
    let quiz = self.get_quiz(quiz_id).await?;
    let (report, raw_score) = grade(&quiz, answers)?;

    self.results
      .append_result(quiz.id, quiz.subject, raw_score, report.correct, report.total)
      .await?;
    let points = self
      .tracker
      .record_activity(quiz.subject, ActivityType::QuizCompleted, Some(raw_score))
      .await?;

    info!(target: "quiz", %quiz_id, subject = %quiz.subject, topic = %quiz.topic, score = report.score, correct = report.correct, total = report.total, points, "Submission graded");
    Ok(report)
  }
}
