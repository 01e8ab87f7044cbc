//! Progress tracking: point awards per activity and the level derived from the
//! cumulative total.
//!
//! Points live in an append-only log; totals are always recomputed by summing
//! the log, never stored as a running counter.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{ActivityType, Level, Subject};
use crate::store::{ProgressRepository, StorageError};

const INTERACTION_POINTS: u32 = 5;
const QUIZ_BASE_POINTS: u32 = 10;
const QUIZ_EXCELLENT_BONUS: u32 = 10;
const QUIZ_GOOD_BONUS: u32 = 5;

/// Points awarded for a single activity.
///
/// `score` only matters for quiz completions: 80 and above earns the large
/// bonus, 60 up to 80 the small one.
pub fn points_for(activity: ActivityType, score: Option<f64>) -> u32 {
  match activity {
    ActivityType::Interaction => INTERACTION_POINTS,
    ActivityType::QuizCompleted => {
      let bonus = match score {
        Some(s) if s >= 80.0 => QUIZ_EXCELLENT_BONUS,
        Some(s) if s >= 60.0 => QUIZ_GOOD_BONUS,
        _ => 0,
      };
      QUIZ_BASE_POINTS + bonus
    }
  }
}

/// Single-slot level: the highest threshold reached wins.
pub fn compute_level(total_points: u64) -> Level {
  match total_points {
    p if p >= 1000 => Level::Expert,
    p if p >= 500 => Level::Advanced,
    p if p >= 200 => Level::Intermediate,
    p if p >= 50 => Level::BeginnerPlus,
    _ => Level::Beginner,
  }
}

#[derive(Clone)]
pub struct ProgressTracker {
  log: Arc<dyn ProgressRepository>,
}

impl ProgressTracker {
  pub fn new(log: Arc<dyn ProgressRepository>) -> Self {
    Self { log }
  }

  /// Append one entry for `activity` and return the points it earned.
  #[instrument(level = "debug", skip(self), fields(%subject, activity = activity.as_str()))]
  pub async fn record_activity(
    &self,
    subject: Subject,
    activity: ActivityType,
    score: Option<f64>,
  ) -> Result<u32, StorageError> {
    let points = points_for(activity, score);
    let details = score.map(|s| serde_json::json!({ "score": s }));
    let id = self.log.append_entry(subject, activity, points, details).await?;
    debug!(target: "progress", entry_id = id, points, "Progress entry appended");
    Ok(points)
  }
}
