//! Application state: store handles, the three components built on them,
//! prompts, and the optional LLM client.
//!
//! The store is opened once at startup and passed explicitly to each
//! component; there is no global handle.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_tutor_config_from_env, Prompts, Settings};
use crate::llm::{ChatModel, HttpChatModel};
use crate::progress::ProgressTracker;
use crate::quiz::QuizEngine;
use crate::stats::StatisticsAggregator;
use crate::store::sqlite::SqliteInitError;
use crate::store::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub tracker: ProgressTracker,
    pub quizzes: QuizEngine,
    pub stats: StatisticsAggregator,
    pub llm: Option<Arc<dyn ChatModel>>,
    pub prompts: Prompts,
    pub settings: Settings,
}

impl AppState {
    /// Build state from env: settings, TOML prompts, SQLite store, LLM client.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, SqliteInitError> {
        let settings = Settings::from_env();
        let prompts = load_tutor_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let storage = Storage::sqlite(&settings.database_url).await?;

        let llm: Option<Arc<dyn ChatModel>> = match HttpChatModel::from_settings(&settings) {
            Some(m) => {
                info!(target: "tutor_backend", base_url = %m.base_url, model = %m.model, timeout = ?m.timeout, "LLM enabled.");
                Some(Arc::new(m))
            }
            None => {
                warn!(target: "tutor_backend", "LLM disabled (no LLM_API_KEY / GROQ_API_KEY). Chat and quiz generation will fail.");
                None
            }
        };

        Ok(Self::with_parts(storage, llm, prompts, settings))
    }

    /// Wire the components over an already-opened store.
    pub fn with_parts(
        storage: Storage,
        llm: Option<Arc<dyn ChatModel>>,
        prompts: Prompts,
        settings: Settings,
    ) -> Self {
        let tracker = ProgressTracker::new(storage.progress.clone());
        let quizzes = QuizEngine::new(storage.quizzes.clone(), storage.results.clone(), tracker.clone());
        let stats = StatisticsAggregator::new(storage.progress.clone(), storage.results.clone());
        Self {
            storage,
            tracker,
            quizzes,
            stats,
            llm,
            prompts,
            settings,
        }
    }
}
