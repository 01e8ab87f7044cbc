//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures become `AppError` responses.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::Subject;
use crate::error::AppError;
use crate::logic;
use crate::protocol::*;
use crate::routes::extract::{AppJson, AppQuery};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_root() -> impl IntoResponse {
  Json(WelcomeOut {
    message: "Bienvenue sur l'API du Tuteur Éducatif Personnalisé",
    version: env!("CARGO_PKG_VERSION"),
    subjects: Subject::ALL,
  })
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject, message_len = body.message.len()))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  AppJson(body): AppJson<ChatIn>,
) -> Result<Json<ChatOut>, AppError> {
  let out = logic::chat(&state, body).await?;
  info!(target: "chat", subject = %out.subject, response_len = out.response.len(), "HTTP chat answered");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject, topic = %body.topic))]
pub async fn http_post_quiz_generate(
  State(state): State<Arc<AppState>>,
  AppJson(body): AppJson<QuizGenerateIn>,
) -> Result<Json<QuizGenerateOut>, AppError> {
  let out = logic::generate_quiz(&state, body).await?;
  info!(target: "quiz", quiz_id = out.quiz_id, n_questions = out.quiz.questions.len(), "HTTP quiz generated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(quiz_id = body.quiz_id, n_answers = body.answers.len()))]
pub async fn http_post_quiz_submit(
  State(state): State<Arc<AppState>>,
  AppJson(body): AppJson<QuizSubmitIn>,
) -> Result<impl IntoResponse, AppError> {
  let report = logic::submit_quiz(&state, body).await?;
  Ok(Json(report))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  Ok(Json(logic::progress(&state, &subject).await?))
}

#[instrument(level = "info", skip(state), fields(limit = ?q.limit))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
  AppQuery(q): AppQuery<HistoryQuery>,
) -> Result<Json<HistoryOut>, AppError> {
  Ok(Json(logic::history(&state, &subject, q.limit).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_history(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
) -> Result<Json<MessageOut>, AppError> {
  Ok(Json(logic::clear_history(&state, &subject).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_leaderboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let report = logic::leaderboard(&state).await?;
  info!(target: "progress", total_points = report.total_points, badges = report.badges.len(), "HTTP leaderboard served");
  Ok(Json(report))
}
