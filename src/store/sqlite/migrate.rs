use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates chat history, quizzes, quiz results, progress and their indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
  async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
      .bind(version)
      .fetch_optional(pool)
      .await?;
    Ok(row.is_some())
  }

  sqlx::query(
    r"
      CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL
      );
    ",
  )
  .execute(pool)
  .await?;

  if !is_applied(pool, 1).await? {
    let mut tx = pool.begin().await?;

    sqlx::query(
      r"
        CREATE TABLE IF NOT EXISTS chat_history (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          subject TEXT NOT NULL,
          role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
          content TEXT NOT NULL,
          timestamp TEXT NOT NULL
        );
      ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
      r"
        CREATE TABLE IF NOT EXISTS quizzes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          subject TEXT NOT NULL,
          topic TEXT NOT NULL,
          quiz_data TEXT NOT NULL,
          created_at TEXT NOT NULL
        );
      ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
      r"
        CREATE TABLE IF NOT EXISTS quiz_results (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          quiz_id INTEGER NOT NULL,
          subject TEXT NOT NULL,
          score REAL NOT NULL CHECK (score BETWEEN 0 AND 100),
          correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
          total_questions INTEGER NOT NULL CHECK (total_questions > 0),
          completed_at TEXT NOT NULL,
          FOREIGN KEY (quiz_id) REFERENCES quizzes(id)
        );
      ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
      r"
        CREATE TABLE IF NOT EXISTS progress (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          subject TEXT NOT NULL,
          activity_type TEXT NOT NULL,
          points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
          details TEXT,
          timestamp TEXT NOT NULL
        );
      ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_history_subject_ts ON chat_history (subject, timestamp, id);")
      .execute(&mut *tx)
      .await?;

    sqlx::query(
      "CREATE INDEX IF NOT EXISTS idx_quiz_results_subject_completed ON quiz_results (subject, completed_at, id);",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_progress_subject ON progress (subject, id);")
      .execute(&mut *tx)
      .await?;

    sqlx::query(
      r"
        INSERT INTO schema_migrations (version, applied_at)
        VALUES (?1, ?2)
        ON CONFLICT(version) DO NOTHING
      ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
  }

  Ok(())
}
