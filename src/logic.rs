//! Core behaviors behind the HTTP handlers.
//!
//! Each operation makes at most one LLM call, and nothing is written to the
//! store until that call has succeeded.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::{ActivityType, Role, Subject};
use crate::error::AppError;
use crate::llm::{ChatModel, ChatTurn, GenerationBudget};
use crate::protocol::*;
use crate::quiz::{parse_generated, ScoreReport};
use crate::state::AppState;
use crate::stats::{LeaderboardReport, Statistics};
use crate::util::{fill_template, trunc_for_log};

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 200;
pub const MAX_QUESTIONS: u32 = 20;

pub fn parse_subject(raw: &str) -> Result<Subject, AppError> {
  raw.parse::<Subject>().map_err(|e| AppError::Validation(e.to_string()))
}

fn require_llm(state: &AppState) -> Result<&dyn ChatModel, AppError> {
  state.llm.as_deref().ok_or(AppError::Configuration)
}

#[instrument(level = "info", skip(state, req), fields(subject = %req.subject, message_len = req.message.len()))]
pub async fn chat(state: &AppState, req: ChatIn) -> Result<ChatOut, AppError> {
  let subject = parse_subject(&req.subject)?;
  if req.message.trim().is_empty() {
    return Err(AppError::Validation("message must not be empty".into()));
  }
  let llm = require_llm(state)?;

  let history = state.storage.chat.recent_messages(subject, state.settings.history_context).await?;

  let system = format!(
    "{}{}",
    state.prompts.system_for(subject),
    fill_template(&state.prompts.student_level_suffix, &[("student_level", req.student_level.as_str())])
  );
  let mut messages = Vec::with_capacity(history.len() + 2);
  messages.push(ChatTurn::system(system));
  for m in &history {
    messages.push(match m.role {
      Role::User => ChatTurn::user(m.content.clone()),
      Role::Assistant => ChatTurn::assistant(m.content.clone()),
    });
  }
  messages.push(ChatTurn::user(req.message.clone()));

  info!(target: "chat", %subject, model = llm.model_name(), context = history.len(), preview = %trunc_for_log(&req.message, 50), "Sending chat to LLM");
  let reply = llm.complete(&messages, GenerationBudget::CHAT).await?;
  info!(target: "chat", %subject, preview = %trunc_for_log(&reply, 50), "LLM reply received");

  state.storage.chat.append_message(subject, Role::User, &req.message).await?;
  state.storage.chat.append_message(subject, Role::Assistant, &reply).await?;
  state.tracker.record_activity(subject, ActivityType::Interaction, None).await?;

  Ok(ChatOut { response: reply, subject, timestamp: Utc::now() })
}

#[instrument(level = "info", skip(state, req), fields(subject = %req.subject, num_questions = req.num_questions))]
pub async fn generate_quiz(state: &AppState, req: QuizGenerateIn) -> Result<QuizGenerateOut, AppError> {
  let subject = parse_subject(&req.subject)?;
  if req.topic.trim().is_empty() {
    return Err(AppError::Validation("topic must not be empty".into()));
  }
  if req.num_questions == 0 || req.num_questions > MAX_QUESTIONS {
    return Err(AppError::Validation(format!("num_questions must be between 1 and {MAX_QUESTIONS}")));
  }
  let llm = require_llm(state)?;

  let num = req.num_questions.to_string();
  let user = fill_template(
    &state.prompts.quiz_user_template,
    &[
      ("num_questions", num.as_str()),
      ("topic", req.topic.as_str()),
      ("subject", subject.as_str()),
      ("difficulty", req.difficulty.as_str()),
    ],
  );
  let messages = [ChatTurn::system(state.prompts.quiz_system.clone()), ChatTurn::user(user)];

  info!(target: "quiz", %subject, model = llm.model_name(), topic = %trunc_for_log(&req.topic, 60), "Requesting quiz from LLM");
  let text = llm.complete(&messages, GenerationBudget::QUIZ).await?;
  let content = parse_generated(&text)?;
  if content.questions.len() != req.num_questions as usize {
    warn!(target: "quiz", requested = req.num_questions, received = content.questions.len(), "Generator returned a different question count");
  }

  let quiz_id = state.quizzes.create_quiz(subject, &req.topic, &content).await?;
  Ok(QuizGenerateOut { quiz_id, quiz: content, subject })
}

#[instrument(level = "info", skip(state, req), fields(quiz_id = req.quiz_id))]
pub async fn submit_quiz(state: &AppState, req: QuizSubmitIn) -> Result<ScoreReport, AppError> {
  Ok(state.quizzes.score_submission(req.quiz_id, &req.answers).await?)
}

pub async fn progress(state: &AppState, subject: &str) -> Result<Statistics, AppError> {
  let subject = parse_subject(subject)?;
  Ok(state.stats.get_statistics(subject).await?)
}

pub async fn leaderboard(state: &AppState) -> Result<LeaderboardReport, AppError> {
  Ok(state.stats.get_leaderboard().await?)
}

#[instrument(level = "info", skip(state))]
pub async fn history(state: &AppState, subject: &str, limit: Option<u32>) -> Result<HistoryOut, AppError> {
  let subject = parse_subject(subject)?;
  let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
  let history = state.storage.chat.recent_messages(subject, limit).await?;
  Ok(HistoryOut { history, subject })
}

#[instrument(level = "info", skip(state))]
pub async fn clear_history(state: &AppState, subject: &str) -> Result<MessageOut, AppError> {
  let subject = parse_subject(subject)?;
  let removed = state.storage.chat.clear_subject(subject).await?;
  info!(target: "chat", %subject, removed, "Chat history cleared");
  Ok(MessageOut { message: format!("Historique de {subject} effacé avec succès") })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::{Prompts, Settings};
  use crate::llm::testing::ScriptedModel;
  use crate::llm::LlmError;
  use crate::quiz::fixtures;
  use crate::store::testing::memory_storage;

  async fn state_with(name: &str, model: Option<Arc<ScriptedModel>>) -> AppState {
    let storage = memory_storage(name).await;
    let llm = model.map(|m| m as Arc<dyn ChatModel>);
    AppState::with_parts(storage, llm, Prompts::default(), Settings::default())
  }

  fn chat_in(subject: &str, message: &str) -> ChatIn {
    ChatIn { message: message.into(), subject: subject.into(), student_level: "seconde".into() }
  }

  #[tokio::test]
  async fn chat_replays_history_and_records_interaction() {
    let model = Arc::new(ScriptedModel::new(vec![Ok("Réponse 1".into()), Ok("Réponse 2".into())]));
    let state = state_with("logic_chat", Some(model.clone())).await;

    chat(&state, chat_in("svt", "Qu'est-ce que la mitose ?")).await.unwrap();
    let out = chat(&state, chat_in("svt", "Et la méiose ?")).await.unwrap();
    assert_eq!(out.response, "Réponse 2");
    assert_eq!(out.subject, Subject::Svt);

    let seen = model.seen.lock().unwrap();
    let (second, budget) = &seen[1];
    assert_eq!(*budget, GenerationBudget::CHAT);
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].role, "system");
    assert!(second[0].content.contains("Sciences de la Vie"));
    assert!(second[0].content.contains("seconde"));
    assert_eq!(second[1], ChatTurn::user("Qu'est-ce que la mitose ?"));
    assert_eq!(second[2], ChatTurn::assistant("Réponse 1"));
    assert_eq!(second[3], ChatTurn::user("Et la méiose ?"));
    drop(seen);

    let stats = state.stats.get_statistics(Subject::Svt).await.unwrap();
    assert_eq!(stats.total_points, 10);
    assert_eq!(stats.interaction_count, 2);
  }

  #[tokio::test]
  async fn chat_failure_persists_nothing() {
    let model = Arc::new(ScriptedModel::new(vec![Err(LlmError::Status { status: 500, detail: "boom".into() })]));
    let state = state_with("logic_chat_fail", Some(model)).await;

    let err = chat(&state, chat_in("histoire_geo", "Napoléon ?")).await.unwrap_err();
    assert_eq!(err.kind(), "upstream");
    assert!(state.storage.chat.recent_messages(Subject::HistoireGeo, 50).await.unwrap().is_empty());
    assert_eq!(state.stats.get_statistics(Subject::HistoireGeo).await.unwrap().total_points, 0);
  }

  #[tokio::test]
  async fn missing_credential_is_a_configuration_error() {
    let state = state_with("logic_no_llm", None).await;
    let err = chat(&state, chat_in("svt", "Bonjour")).await.unwrap_err();
    assert_eq!(err.kind(), "configuration");
    let req = QuizGenerateIn { subject: "svt".into(), topic: "ADN".into(), difficulty: "moyen".into(), num_questions: 3 };
    assert_eq!(generate_quiz(&state, req).await.unwrap_err().kind(), "configuration");
  }

  #[tokio::test]
  async fn unknown_subject_is_rejected() {
    let state = state_with("logic_bad_subject", None).await;
    assert_eq!(chat(&state, chat_in("maths", "1+1")).await.unwrap_err().kind(), "validation");
    assert_eq!(progress(&state, "maths").await.unwrap_err().kind(), "validation");
  }

  #[tokio::test]
  async fn generate_then_submit() {
    let body = serde_json::to_string(&fixtures::content(5)).unwrap();
    let model = Arc::new(ScriptedModel::new(vec![Ok(format!("```json\n{body}\n```"))]));
    let state = state_with("logic_generate", Some(model.clone())).await;

    let req = QuizGenerateIn {
      subject: "histoire_geo".into(),
      topic: "La Révolution française".into(),
      difficulty: "difficile".into(),
      num_questions: 5,
    };
    let out = generate_quiz(&state, req).await.unwrap();
    assert_eq!(out.quiz, fixtures::content(5));
    {
      let seen = model.seen.lock().unwrap();
      let (msgs, budget) = &seen[0];
      assert_eq!(*budget, GenerationBudget::QUIZ);
      assert!(msgs[1].content.contains("La Révolution française"));
      assert!(msgs[1].content.contains("difficile"));
    }

    let report = submit_quiz(&state, QuizSubmitIn { quiz_id: out.quiz_id, answers: fixtures::answers(5, 3) })
      .await
      .unwrap();
    assert_eq!(report.score, 60.0);

    let stats = progress(&state, "histoire_geo").await.unwrap();
    assert_eq!(stats.quizzes_completed, 1);
    assert_eq!(stats.total_points, 15);
    assert_eq!(stats.recent_quizzes[0].topic, "La Révolution française");
  }

  #[tokio::test]
  async fn garbage_quiz_output_is_malformed_and_not_stored() {
    let model = Arc::new(ScriptedModel::new(vec![Ok("Je ne peux pas faire ça.".into())]));
    let state = state_with("logic_generate_garbage", Some(model)).await;
    let req = QuizGenerateIn { subject: "svt".into(), topic: "ADN".into(), difficulty: "moyen".into(), num_questions: 3 };
    let err = generate_quiz(&state, req).await.unwrap_err();
    assert_eq!(err.kind(), "malformed_upstream");
    assert!(matches!(
      state.storage.quizzes.get_quiz(1).await,
      Err(crate::store::StorageError::NotFound)
    ));
  }

  #[tokio::test]
  async fn question_count_is_bounded() {
    let state = state_with("logic_bounds", None).await;
    for n in [0, MAX_QUESTIONS + 1] {
      let req = QuizGenerateIn { subject: "svt".into(), topic: "ADN".into(), difficulty: "moyen".into(), num_questions: n };
      assert_eq!(generate_quiz(&state, req).await.unwrap_err().kind(), "validation");
    }
  }

  #[tokio::test]
  async fn history_limit_and_clear() {
    let state = state_with("logic_history", None).await;
    for i in 0..30 {
      state.storage.chat.append_message(Subject::Svt, Role::User, &format!("m{i}")).await.unwrap();
    }
    state.storage.chat.append_message(Subject::HistoireGeo, Role::User, "autre").await.unwrap();

    let h = history(&state, "svt", None).await.unwrap();
    assert_eq!(h.history.len(), DEFAULT_HISTORY_LIMIT as usize);
    assert_eq!(h.history.last().unwrap().content, "m29");
    assert_eq!(history(&state, "svt", Some(0)).await.unwrap().history.len(), 1);

    clear_history(&state, "svt").await.unwrap();
    assert!(history(&state, "svt", None).await.unwrap().history.is_empty());
    assert_eq!(history(&state, "histoire_geo", None).await.unwrap().history.len(), 1);
  }
}
