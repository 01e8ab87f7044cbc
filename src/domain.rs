//! Domain models used by the backend: subjects, chat messages, quizzes, results,
//! progress entries, and the derived level/badge labels.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level topic domain. Partitions every stored row and statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
  /// Histoire-Géographie.
  #[serde(rename = "histoire_geo")]
  HistoireGeo,
  /// Sciences de la Vie et de la Terre.
  #[serde(rename = "svt")]
  Svt,
}

impl Subject {
  pub const ALL: [Subject; 2] = [Subject::HistoireGeo, Subject::Svt];

  pub fn as_str(self) -> &'static str {
    match self {
      Subject::HistoireGeo => "histoire_geo",
      Subject::Svt => "svt",
    }
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubject(pub String);

impl fmt::Display for UnknownSubject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "unknown subject '{}' (expected one of: histoire_geo, svt)", self.0)
  }
}

impl FromStr for Subject {
  type Err = UnknownSubject;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "histoire_geo" => Ok(Subject::HistoireGeo),
      "svt" => Ok(Subject::Svt),
      other => Err(UnknownSubject(other.to_string())),
    }
  }
}

/// Who wrote a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  User,
  Assistant,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Assistant => "assistant",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "user" => Some(Role::User),
      "assistant" => Some(Role::Assistant),
      _ => None,
    }
  }
}

/// One persisted chat line. Append-only.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
  pub timestamp: DateTime<Utc>,
}

/// A single multiple-choice question as produced by the generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: usize,
  #[serde(default)]
  pub explanation: String,
}

/// The generated body of a quiz (what the model returns, what the client sees).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizContent {
  #[serde(default)]
  pub title: String,
  pub questions: Vec<QuizQuestion>,
}

/// Stored quiz. Immutable after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Quiz {
  pub id: i64,
  pub subject: Subject,
  pub topic: String,
  pub content: QuizContent,
  #[allow(dead_code)]
  pub created_at: DateTime<Utc>,
}

/// One graded submission. `score` is kept unrounded.
///
/// Statistics only fold `score`; the other columns are the audit record.
#[derive(Clone, Debug, PartialEq)]
pub struct QuizResult {
  #[allow(dead_code)]
  pub id: i64,
  #[allow(dead_code)]
  pub quiz_id: i64,
  #[allow(dead_code)]
  pub subject: Subject,
  pub score: f64,
  #[allow(dead_code)]
  pub correct_answers: u32,
  #[allow(dead_code)]
  pub total_questions: u32,
  #[allow(dead_code)]
  pub completed_at: DateTime<Utc>,
}

/// A quiz result joined with its quiz topic, as listed in statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecentQuiz {
  pub score: f64,
  pub completed_at: DateTime<Utc>,
  pub topic: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
  Interaction,
  QuizCompleted,
}

impl ActivityType {
  pub fn as_str(self) -> &'static str {
    match self {
      ActivityType::Interaction => "interaction",
      ActivityType::QuizCompleted => "quiz_completed",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "interaction" => Some(ActivityType::Interaction),
      "quiz_completed" => Some(ActivityType::QuizCompleted),
      _ => None,
    }
  }
}

/// Append-only audit entry; the per-subject sum of `points` is the score.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEntry {
  #[allow(dead_code)]
  pub id: i64,
  #[allow(dead_code)]
  pub subject: Subject,
  pub activity_type: ActivityType,
  pub points: u32,
  #[allow(dead_code)]
  pub details: Option<serde_json::Value>,
  #[allow(dead_code)]
  pub timestamp: DateTime<Utc>,
}

/// Derived from total points; exactly one level applies at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
  Beginner,
  BeginnerPlus,
  Intermediate,
  Advanced,
  Expert,
}

impl Level {
  pub fn name(self) -> &'static str {
    match self {
      Level::Beginner => "Beginner",
      Level::BeginnerPlus => "Beginner+",
      Level::Intermediate => "Intermediate",
      Level::Advanced => "Advanced",
      Level::Expert => "Expert",
    }
  }

  pub fn icon(self) -> &'static str {
    match self {
      Level::Beginner => "🔰",
      Level::BeginnerPlus => "🌱",
      Level::Intermediate => "📚",
      Level::Advanced => "⭐",
      Level::Expert => "🏆",
    }
  }
}

/// Leaderboard achievements. Unlike `Level`, several may be held at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Badge {
  Expert,
  Advanced,
  Persistent,
  Excellent,
}

impl Badge {
  pub fn name(self) -> &'static str {
    match self {
      Badge::Expert => "Expert",
      Badge::Advanced => "Advanced",
      Badge::Persistent => "Persistent",
      Badge::Excellent => "Excellent",
    }
  }

  pub fn icon(self) -> &'static str {
    match self {
      Badge::Expert => "🏆",
      Badge::Advanced => "⭐",
      Badge::Persistent => "💪",
      Badge::Excellent => "🎯",
    }
  }
}

/// Name + icon pair as shown to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Label {
  pub name: &'static str,
  pub icon: &'static str,
}

impl From<Level> for Label {
  fn from(l: Level) -> Self {
    Label { name: l.name(), icon: l.icon() }
  }
}

impl From<Badge> for Label {
  fn from(b: Badge) -> Self {
    Label { name: b.name(), icon: b.icon() }
  }
}

/// Round half away from zero to two decimals.
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}
