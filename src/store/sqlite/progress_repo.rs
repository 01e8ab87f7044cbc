use chrono::Utc;

use super::{
  db_err,
  mapping::{map_progress_row, u32_to_i64},
  SqliteRepository,
};
use crate::domain::{ActivityType, ProgressEntry, Subject};
use crate::store::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
  async fn append_entry(
    &self,
    subject: Subject,
    activity: ActivityType,
    points: u32,
    details: Option<serde_json::Value>,
  ) -> Result<i64, StorageError> {
    let details = details
      .map(|d| serde_json::to_string(&d))
      .transpose()
      .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let res = sqlx::query(
      r"
        INSERT INTO progress (subject, activity_type, points, details, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5)
      ",
    )
    .bind(subject.as_str())
    .bind(activity.as_str())
    .bind(u32_to_i64(points))
    .bind(details)
    .bind(Utc::now())
    .execute(&self.pool)
    .await
    .map_err(db_err)?;

    Ok(res.last_insert_rowid())
  }

  async fn entries_for(&self, subject: Subject) -> Result<Vec<ProgressEntry>, StorageError> {
    let rows = sqlx::query(
      r"
        SELECT id, subject, activity_type, points, details, timestamp
        FROM progress
        WHERE subject = ?1
        ORDER BY id ASC
      ",
    )
    .bind(subject.as_str())
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    rows.iter().map(map_progress_row).collect()
  }
}
