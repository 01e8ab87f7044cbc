use chrono::Utc;

use super::{db_err, mapping::map_chat_row, SqliteRepository};
use crate::domain::{ChatMessage, Role, Subject};
use crate::store::{ChatHistoryRepository, StorageError};

#[async_trait::async_trait]
impl ChatHistoryRepository for SqliteRepository {
  async fn append_message(&self, subject: Subject, role: Role, content: &str) -> Result<i64, StorageError> {
    let res = sqlx::query(
      r"
        INSERT INTO chat_history (subject, role, content, timestamp)
        VALUES (?1, ?2, ?3, ?4)
      ",
    )
    .bind(subject.as_str())
    .bind(role.as_str())
    .bind(content)
    .bind(Utc::now())
    .execute(&self.pool)
    .await
    .map_err(db_err)?;

    Ok(res.last_insert_rowid())
  }

  async fn recent_messages(&self, subject: Subject, limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
    let rows = sqlx::query(
      r"
        SELECT subject, role, content, timestamp
        FROM chat_history
        WHERE subject = ?1
        ORDER BY timestamp DESC, id DESC
        LIMIT ?2
      ",
    )
    .bind(subject.as_str())
    .bind(i64::from(limit))
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    // Newest-first from the query; callers want chronological order.
    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter().rev() {
      out.push(map_chat_row(row)?);
    }
    Ok(out)
  }

  async fn clear_subject(&self, subject: Subject) -> Result<u64, StorageError> {
    let res = sqlx::query("DELETE FROM chat_history WHERE subject = ?1")
      .bind(subject.as_str())
      .execute(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(res.rows_affected())
  }
}
