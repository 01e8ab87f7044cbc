//! Tuteur Éducatif · French tutoring backend (Histoire-Géo, SVT)
//!
//! - Axum HTTP API (chat, quiz generation/submission, progress, leaderboard)
//! - SQLite persistence via sqlx (chat history, quizzes, results, progress log)
//! - OpenAI-compatible chat-completions client (Groq by default)
//!
//! Important env variables:
//!   PORT                : u16 (default 8000)
//!   DATABASE_URL        : default "sqlite://tuteur_educatif.db?mode=rwc"
//!   LLM_API_KEY         : LLM credential (GROQ_API_KEY is accepted too)
//!   LLM_BASE_URL        : default "https://api.groq.com/openai/v1"
//!   LLM_MODEL           : default "llama-3.3-70b-versatile"
//!   LLM_TIMEOUT_SECS    : timeout for every LLM call (default 30)
//!   HISTORY_CONTEXT_LEN : past messages replayed into chat (default 10)
//!   TUTOR_CONFIG_PATH   : path to TOML config (prompt overrides)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod config;
mod domain;
mod error;
mod llm;
mod logic;
mod progress;
mod protocol;
mod quiz;
mod routes;
mod state;
mod stats;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Open the store, load prompts, build the LLM client.
  let state = Arc::new(AppState::from_env().await?);
  let port = state.settings.port;

  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "tutor_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "tutor_backend", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "tutor_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
