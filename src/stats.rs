//! Statistics aggregation: per-subject folds over the progress log and quiz
//! results, and the cross-subject leaderboard with its badges.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::domain::{round2, ActivityType, Badge, Label, ProgressEntry, QuizResult, RecentQuiz, Subject};
use crate::progress::compute_level;
use crate::store::{ProgressRepository, QuizResultRepository, StorageError};

pub const RECENT_QUIZZES: u32 = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
  pub subject: Subject,
  pub total_points: u64,
  #[serde(rename = "interactions")]
  pub interaction_count: u64,
  pub quizzes_completed: u64,
  pub avg_score: f64,
  pub best_score: f64,
  pub recent_quizzes: Vec<RecentQuiz>,
  pub level: Label,
}

impl Statistics {
  /// Fold stored rows into statistics. Empty inputs yield zeros, never errors.
  pub fn fold(subject: Subject, entries: &[ProgressEntry], results: &[QuizResult], recent: Vec<RecentQuiz>) -> Self {
    let total_points: u64 = entries.iter().map(|e| u64::from(e.points)).sum();
    let interaction_count =
      entries.iter().filter(|e| e.activity_type == ActivityType::Interaction).count() as u64;

    let (sum, best) = results
      .iter()
      .fold((0.0_f64, 0.0_f64), |(sum, best), r| (sum + r.score, best.max(r.score)));
    let avg = if results.is_empty() { 0.0 } else { sum / results.len() as f64 };

    Statistics {
      subject,
      total_points,
      interaction_count,
      quizzes_completed: results.len() as u64,
      avg_score: round2(avg),
      best_score: round2(best),
      recent_quizzes: recent,
      level: compute_level(total_points).into(),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardReport {
  pub total_points: u64,
  pub total_quizzes: u64,
  pub badges: Vec<Label>,
  pub subjects: BTreeMap<Subject, Statistics>,
}

/// Each badge is checked on its own, so several can be earned at once
/// (Expert implies Advanced here, unlike the single-slot level).
pub fn badges_for(total_points: u64, total_quizzes: u64, per_subject: &[&Statistics]) -> Vec<Badge> {
  let mut badges = Vec::new();
  if total_points >= 1000 {
    badges.push(Badge::Expert);
  }
  if total_points >= 500 {
    badges.push(Badge::Advanced);
  }
  if total_quizzes >= 10 {
    badges.push(Badge::Persistent);
  }
  if per_subject.iter().any(|s| s.avg_score >= 80.0) {
    badges.push(Badge::Excellent);
  }
  badges
}

impl LeaderboardReport {
  pub fn from_subjects(subjects: BTreeMap<Subject, Statistics>) -> Self {
    let total_points = subjects.values().map(|s| s.total_points).sum();
    let total_quizzes = subjects.values().map(|s| s.quizzes_completed).sum();
    let stats: Vec<&Statistics> = subjects.values().collect();
    let badges = badges_for(total_points, total_quizzes, &stats).into_iter().map(Label::from).collect();
    Self { total_points, total_quizzes, badges, subjects }
  }
}

#[derive(Clone)]
pub struct StatisticsAggregator {
  progress: Arc<dyn ProgressRepository>,
  results: Arc<dyn QuizResultRepository>,
}

impl StatisticsAggregator {
  pub fn new(progress: Arc<dyn ProgressRepository>, results: Arc<dyn QuizResultRepository>) -> Self {
    Self { progress, results }
  }

  #[instrument(level = "debug", skip(self), fields(%subject))]
  pub async fn get_statistics(&self, subject: Subject) -> Result<Statistics, StorageError> {
    let entries = self.progress.entries_for(subject).await?;
    let results = self.results.results_for(subject).await?;
    let recent = self.results.recent_with_topic(subject, RECENT_QUIZZES).await?;
    Ok(Statistics::fold(subject, &entries, &results, recent))
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_leaderboard(&self) -> Result<LeaderboardReport, StorageError> {
    let mut subjects = BTreeMap::new();
    for subject in Subject::ALL {
      subjects.insert(subject, self.get_statistics(subject).await?);
    }
    Ok(LeaderboardReport::from_subjects(subjects))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::progress::ProgressTracker;
  use crate::quiz::{fixtures, QuizEngine};
  use crate::store::testing::memory_storage;

  fn entry(activity: ActivityType, points: u32) -> ProgressEntry {
    ProgressEntry { id: 0, subject: Subject::Svt, activity_type: activity, points, details: None, timestamp: Utc::now() }
  }

  fn result(score: f64) -> QuizResult {
    QuizResult {
      id: 0,
      quiz_id: 1,
      subject: Subject::Svt,
      score,
      correct_answers: 0,
      total_questions: 3,
      completed_at: Utc::now(),
    }
  }

  fn stats_with(points: u64, quizzes: u64, avg: f64) -> Statistics {
    Statistics {
      subject: Subject::Svt,
      total_points: points,
      interaction_count: 0,
      quizzes_completed: quizzes,
      avg_score: avg,
      best_score: avg,
      recent_quizzes: vec![],
      level: compute_level(points).into(),
    }
  }

  #[test]
  fn empty_fold_is_all_zero() {
    let s = Statistics::fold(Subject::Svt, &[], &[], vec![]);
    assert_eq!(s.total_points, 0);
    assert_eq!(s.interaction_count, 0);
    assert_eq!(s.quizzes_completed, 0);
    assert_eq!(s.avg_score, 0.0);
    assert_eq!(s.best_score, 0.0);
    assert!(s.recent_quizzes.is_empty());
    assert_eq!(s.level.name, "Beginner");
  }

  #[test]
  fn fold_sums_counts_and_rounds() {
    let entries = vec![
      entry(ActivityType::Interaction, 5),
      entry(ActivityType::Interaction, 5),
      entry(ActivityType::QuizCompleted, 20),
      entry(ActivityType::QuizCompleted, 15),
    ];
    let results = vec![result(100.0), result(200.0 / 3.0), result(0.0)];
    let s = Statistics::fold(Subject::Svt, &entries, &results, vec![]);
    assert_eq!(s.total_points, 45);
    assert_eq!(s.interaction_count, 2);
    assert_eq!(s.quizzes_completed, 3);
    assert_eq!(s.avg_score, 55.56);
    assert_eq!(s.best_score, 100.0);
    assert_eq!(s.level.name, "Beginner");
  }

  #[test]
  fn statistics_serialize_with_wire_names() {
    let v = serde_json::to_value(Statistics::fold(Subject::HistoireGeo, &[], &[], vec![])).unwrap();
    assert_eq!(v["subject"], "histoire_geo");
    assert_eq!(v["interactions"], 0);
    assert_eq!(v["level"]["name"], "Beginner");
    assert_eq!(v["level"]["icon"], "🔰");
  }

  #[test]
  fn badges_are_independent() {
    let a = stats_with(600, 4, 85.0);
    let b = stats_with(500, 6, 50.0);
    let names: Vec<_> = badges_for(1100, 10, &[&a, &b]).into_iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["Expert", "Advanced", "Persistent", "Excellent"]);

    let low = stats_with(10, 1, 79.99);
    assert!(badges_for(499, 9, &[&low]).is_empty());
    assert_eq!(badges_for(500, 0, &[&low]), vec![Badge::Advanced]);
  }

  #[test]
  fn leaderboard_totals_are_per_subject_sums() {
    let mut subjects = BTreeMap::new();
    subjects.insert(Subject::HistoireGeo, stats_with(700, 6, 70.0));
    subjects.insert(Subject::Svt, stats_with(350, 5, 81.0));
    let lb = LeaderboardReport::from_subjects(subjects);
    assert_eq!(lb.total_points, 1050);
    assert_eq!(lb.total_quizzes, 11);
    let names: Vec<_> = lb.badges.iter().map(|b| b.name).collect();
    assert_eq!(names, vec!["Expert", "Advanced", "Persistent", "Excellent"]);

    let v = serde_json::to_value(&lb).unwrap();
    assert_eq!(v["subjects"]["svt"]["total_points"], 350);
    assert_eq!(v["subjects"]["histoire_geo"]["level"]["name"], "Advanced");
  }

  #[tokio::test]
  async fn aggregates_from_the_store() {
    let storage = memory_storage("stats_from_store").await;
    let tracker = ProgressTracker::new(storage.progress.clone());
    let engine = QuizEngine::new(storage.quizzes.clone(), storage.results.clone(), tracker.clone());
    let agg = StatisticsAggregator::new(storage.progress.clone(), storage.results.clone());

    let empty = agg.get_statistics(Subject::Svt).await.unwrap();
    assert_eq!(empty.total_points, 0);
    assert_eq!(empty.level.name, "Beginner");

    tracker.record_activity(Subject::Svt, ActivityType::Interaction, None).await.unwrap();
    let id = engine.create_quiz(Subject::Svt, "volcans", &fixtures::content(5)).await.unwrap();
    engine.score_submission(id, &fixtures::answers(5, 5)).await.unwrap();
    engine.score_submission(id, &fixtures::answers(5, 3)).await.unwrap();

    let s = agg.get_statistics(Subject::Svt).await.unwrap();
    assert_eq!(s.total_points, 5 + 20 + 15);
    assert_eq!(s.interaction_count, 1);
    assert_eq!(s.quizzes_completed, 2);
    assert_eq!(s.avg_score, 80.0);
    assert_eq!(s.best_score, 100.0);
    assert_eq!(s.recent_quizzes.len(), 2);
    assert_eq!(s.recent_quizzes[0].score, 60.0);
    assert_eq!(s.recent_quizzes[0].topic, "volcans");

    let lb = agg.get_leaderboard().await.unwrap();
    let hg = agg.get_statistics(Subject::HistoireGeo).await.unwrap();
    assert_eq!(lb.total_points, s.total_points + hg.total_points);
    assert_eq!(lb.total_quizzes, 2);
    let names: Vec<_> = lb.badges.iter().map(|b| b.name).collect();
    assert_eq!(names, vec!["Excellent"]);
  }
}
