use std::sync::Arc;
use std::time::Duration;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use tracing::info;

use super::{ChatHistoryRepository, ProgressRepository, QuizRepository, QuizResultRepository, Storage, StorageError};

mod chat_repo;
mod mapping;
mod migrate;
mod progress_repo;
mod quiz_repo;

#[derive(Clone)]
pub struct SqliteRepository {
  pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
  #[error(transparent)]
  Sqlx(#[from] sqlx::Error),
}

pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
  StorageError::Connection(e.to_string())
}

impl SqliteRepository {
  /// Connect to `SQLite` using the given URL.
  ///
  /// # Errors
  ///
  /// Returns `SqliteInitError` if the connection cannot be established or a
  /// connection pragma fails.
  pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .acquire_timeout(Duration::from_secs(5))
      .after_connect(|conn, _meta| {
        Box::pin(async move {
          sqlx::query("PRAGMA foreign_keys = ON;").execute(&mut *conn).await?;
          sqlx::query("PRAGMA journal_mode = WAL;").execute(&mut *conn).await?;
          sqlx::query("PRAGMA busy_timeout = 5000;").execute(&mut *conn).await?;
          Ok(())
        })
      })
      .connect(database_url)
      .await?;
    Ok(Self { pool })
  }

  /// Create tables if they do not exist.
  ///
  /// # Errors
  ///
  /// Returns `SqliteInitError` if migration queries fail.
  pub async fn migrate(&self) -> Result<(), SqliteInitError> {
    migrate::run_migrations(&self.pool).await
  }
}

impl Storage {
  /// Build a `Storage` backed by `SQLite`, running migrations first.
  ///
  /// # Errors
  ///
  /// Returns `SqliteInitError` if connection or migrations cannot be completed.
  pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
    let repo = SqliteRepository::connect(database_url).await?;
    repo.migrate().await?;
    info!(target: "tutor_backend", "SQLite store ready");
    let chat: Arc<dyn ChatHistoryRepository> = Arc::new(repo.clone());
    let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
    let results: Arc<dyn QuizResultRepository> = Arc::new(repo.clone());
    let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
    Ok(Self { chat, quizzes, results, progress })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn repository_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SqliteRepository>();
  }

  #[tokio::test]
  async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
      .await
      .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
      .fetch_one(&repo.pool)
      .await
      .unwrap();
    assert_eq!(n, 1);
  }
}
