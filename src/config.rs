//! Runtime settings (environment) and tutor prompts (optional TOML file).
//!
//! See `Settings::from_env` for the environment variables and `Prompts` for
//! the TOML schema (`[prompts]` table, every key optional).

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::Subject;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tuteur_educatif.db?mode=rwc";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HISTORY_CONTEXT: u32 = 10;

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub database_url: String,
  pub llm_api_key: Option<String>,
  pub llm_base_url: String,
  pub llm_model: String,
  /// Applies to every LLM call (chat and quiz generation).
  pub llm_timeout: Duration,
  /// How many past messages are replayed into the chat context.
  pub history_context: u32,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      database_url: DEFAULT_DATABASE_URL.into(),
      llm_api_key: None,
      llm_base_url: DEFAULT_LLM_BASE_URL.into(),
      llm_model: DEFAULT_LLM_MODEL.into(),
      llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
      history_context: DEFAULT_HISTORY_CONTEXT,
    }
  }
}

impl Settings {
  pub fn from_env() -> Self {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build settings from any key lookup. Unparseable numbers fall back to defaults.
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
    let d = Settings::default();
    let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let parsed = |k: &str| -> Option<u64> {
      let raw = non_empty(k)?;
      match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
          warn!(target: "tutor_backend", key = k, value = %raw, "Ignoring unparseable numeric setting");
          None
        }
      }
    };

    Self {
      port: parsed("PORT").and_then(|p| u16::try_from(p).ok()).unwrap_or(d.port),
      database_url: non_empty("DATABASE_URL").unwrap_or(d.database_url),
      llm_api_key: non_empty("LLM_API_KEY").or_else(|| non_empty("GROQ_API_KEY")),
      llm_base_url: non_empty("LLM_BASE_URL").unwrap_or(d.llm_base_url),
      llm_model: non_empty("LLM_MODEL").unwrap_or(d.llm_model),
      llm_timeout: parsed("LLM_TIMEOUT_SECS").filter(|s| *s > 0).map(Duration::from_secs).unwrap_or(d.llm_timeout),
      history_context: parsed("HISTORY_CONTEXT_LEN")
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(d.history_context),
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TutorConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts sent to the model. Defaults are the French tutoring prompts.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub histoire_geo_system: String,
  pub svt_system: String,
  /// Appended to the subject prompt; `{student_level}` is substituted.
  pub student_level_suffix: String,
  pub quiz_system: String,
  /// Placeholders: `{num_questions}`, `{topic}`, `{subject}`, `{difficulty}`.
  pub quiz_user_template: String,
}

impl Prompts {
  pub fn system_for(&self, subject: Subject) -> &str {
    match subject {
      Subject::HistoireGeo => &self.histoire_geo_system,
      Subject::Svt => &self.svt_system,
    }
  }
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      histoire_geo_system: "Tu es un tuteur expert en Histoire-Géographie pour lycéens français.

Ton rôle :
- Expliquer les concepts de manière claire et adaptée au niveau lycée
- Utiliser des exemples concrets et des analogies
- Encourager la réflexion critique
- Adapter ton niveau de langage à l'élève
- Être patient et bienveillant
- Utiliser des dates, événements et personnages historiques précis

Matières couvertes : Histoire (toutes périodes), Géographie (France, Europe, Monde), Géopolitique

Réponds toujours en français de manière pédagogique.".into(),
      svt_system: "Tu es un tuteur expert en Sciences de la Vie et de la Terre pour lycéens français.

Ton rôle :
- Expliquer les concepts scientifiques de manière accessible
- Utiliser des schémas verbaux et des exemples du quotidien
- Encourager la démarche scientifique et l'esprit critique
- Adapter ton vocabulaire au niveau lycée
- Être encourageant et pédagogue
- Couvrir : Biologie, Géologie, Écologie, Génétique, etc.

Réponds toujours en français de manière pédagogique.".into(),
      student_level_suffix: "\n\nNiveau de l'élève : {student_level}.".into(),
      quiz_system: "Tu es un expert en création de quiz éducatifs. Réponds UNIQUEMENT en JSON valide.".into(),
      quiz_user_template: r#"Génère un quiz de {num_questions} questions sur le thème : {topic}

Matière : {subject}
Niveau : Lycée
Difficulté : {difficulty}

Format de réponse STRICT (JSON) :
{
  "title": "Titre du quiz",
  "questions": [
    {
      "question": "Texte de la question",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correct_answer": 0,
      "explanation": "Explication détaillée de la réponse"
    }
  ]
}

Chaque question a exactement 4 options et correct_answer est l'indice (0 à 3) de la bonne option.
Réponds UNIQUEMENT avec le JSON, sans texte avant ou après."#.into(),
    }
  }
}

/// Load `TutorConfig` from TUTOR_CONFIG_PATH. On any IO/parse error, returns None.
pub fn load_tutor_config_from_env() -> Option<TutorConfig> {
  let path = std::env::var("TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TutorConfig>(&s) {
      Ok(cfg) => {
        info!(target: "tutor_backend", %path, "Loaded tutor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "tutor_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "tutor_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_when_env_is_empty() {
    let s = Settings::from_lookup(lookup(&[]));
    assert_eq!(s.port, 8000);
    assert_eq!(s.llm_api_key, None);
    assert_eq!(s.llm_timeout, Duration::from_secs(30));
    assert_eq!(s.history_context, 10);
    assert_eq!(s.llm_model, DEFAULT_LLM_MODEL);
  }

  #[test]
  fn groq_key_is_accepted_and_bad_numbers_ignored() {
    let s = Settings::from_lookup(lookup(&[
      ("GROQ_API_KEY", "gsk_test"),
      ("PORT", "not-a-port"),
      ("LLM_TIMEOUT_SECS", "12"),
      ("HISTORY_CONTEXT_LEN", "4"),
    ]));
    assert_eq!(s.llm_api_key.as_deref(), Some("gsk_test"));
    assert_eq!(s.port, 8000);
    assert_eq!(s.llm_timeout, Duration::from_secs(12));
    assert_eq!(s.history_context, 4);
  }

  #[test]
  fn blank_key_counts_as_missing() {
    let s = Settings::from_lookup(lookup(&[("LLM_API_KEY", "   ")]));
    assert_eq!(s.llm_api_key, None);
  }

  #[test]
  fn partial_toml_keeps_other_defaults() {
    let cfg: TutorConfig = toml::from_str("[prompts]\nsvt_system = \"Prof de SVT\"\n").unwrap();
    assert_eq!(cfg.prompts.system_for(Subject::Svt), "Prof de SVT");
    assert!(cfg.prompts.system_for(Subject::HistoireGeo).contains("Histoire-Géographie"));
    assert!(cfg.prompts.quiz_user_template.contains("{num_questions}"));
  }
}
