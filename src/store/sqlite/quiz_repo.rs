use chrono::Utc;

use super::{
  db_err,
  mapping::{encode_quiz_content, map_quiz_row, map_recent_row, map_result_row, u32_to_i64},
  SqliteRepository,
};
use crate::domain::{Quiz, QuizContent, QuizResult, RecentQuiz, Subject};
use crate::store::{QuizRepository, QuizResultRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
  async fn insert_quiz(&self, subject: Subject, topic: &str, content: &QuizContent) -> Result<i64, StorageError> {
    let data = encode_quiz_content(content)?;
    let res = sqlx::query(
      r"
        INSERT INTO quizzes (subject, topic, quiz_data, created_at)
        VALUES (?1, ?2, ?3, ?4)
      ",
    )
    .bind(subject.as_str())
    .bind(topic)
    .bind(data)
    .bind(Utc::now())
    .execute(&self.pool)
    .await
    .map_err(db_err)?;

    Ok(res.last_insert_rowid())
  }

  async fn get_quiz(&self, id: i64) -> Result<Quiz, StorageError> {
    let row = sqlx::query("SELECT id, subject, topic, quiz_data, created_at FROM quizzes WHERE id = ?1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;

    match row {
      Some(r) => map_quiz_row(&r),
      None => Err(StorageError::NotFound),
    }
  }
}

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
  async fn append_result(
    &self,
    quiz_id: i64,
    subject: Subject,
    score: f64,
    correct_answers: u32,
    total_questions: u32,
  ) -> Result<i64, StorageError> {
    let res = sqlx::query(
      r"
        INSERT INTO quiz_results (quiz_id, subject, score, correct_answers, total_questions, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      ",
    )
    .bind(quiz_id)
    .bind(subject.as_str())
    .bind(score)
    .bind(u32_to_i64(correct_answers))
    .bind(u32_to_i64(total_questions))
    .bind(Utc::now())
    .execute(&self.pool)
    .await
    .map_err(db_err)?;

    Ok(res.last_insert_rowid())
  }

  async fn results_for(&self, subject: Subject) -> Result<Vec<QuizResult>, StorageError> {
    let rows = sqlx::query(
      r"
        SELECT id, quiz_id, subject, score, correct_answers, total_questions, completed_at
        FROM quiz_results
        WHERE subject = ?1
        ORDER BY completed_at ASC, id ASC
      ",
    )
    .bind(subject.as_str())
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    rows.iter().map(map_result_row).collect()
  }

  async fn recent_with_topic(&self, subject: Subject, limit: u32) -> Result<Vec<RecentQuiz>, StorageError> {
    let rows = sqlx::query(
      r"
        SELECT qr.score, qr.completed_at, q.topic
        FROM quiz_results qr
        JOIN quizzes q ON qr.quiz_id = q.id
        WHERE qr.subject = ?1
        ORDER BY qr.completed_at DESC, qr.id DESC
        LIMIT ?2
      ",
    )
    .bind(subject.as_str())
    .bind(i64::from(limit))
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    rows.iter().map(map_recent_row).collect()
  }
}
