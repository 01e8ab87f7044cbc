//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL is an EnvFilter: "debug", or directives such as
//!   "info,chat=debug,quiz=debug,tutor_backend=debug,tower_http=info".
//! - LOG_FORMAT is "pretty" (default) or "json".
//!
//! Targets are printed. "chat", "quiz" and "progress" tag domain events and
//! "tutor_backend" tags startup and request failures. The tower-http
//! TraceLayer adds its own per-request spans on top.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,chat=debug,quiz=debug,progress=info,tutor_backend=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Blank or invalid directives fall back to the default filter.
fn filter_from(raw: Option<&str>) -> EnvFilter {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = std::env::var("LOG_FORMAT").ok();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from(level.as_deref()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match LogFormat::parse(format.as_deref()) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
