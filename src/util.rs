//! Small utility helpers used across modules.

use thiserror::Error;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation on a char boundary.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let total = s.chars().count();
  if total <= max_chars {
    s.to_string()
  } else {
    format!("{}… ({} chars total)", s.chars().take(max_chars).collect::<String>(), total)
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
  #[error("no JSON object found in model output")]
  NoObject,
  #[error("unterminated JSON object in model output")]
  Unterminated,
}

/// Return the first `{ ... }` slice of free text that parses as a JSON object.
///
/// Handles prose around the object and Markdown code fences. A brace that
/// opens prose (`{niveau lycée}`) is skipped and the scan moves on to the next
/// one. Braces inside JSON strings do not end a candidate.
pub fn extract_json_object(text: &str) -> Result<&str, ExtractError> {
  let mut unterminated = false;
  for (start, _) in text.match_indices('{') {
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<serde_json::Value>();
    match stream.next() {
      Some(Ok(serde_json::Value::Object(_))) => return Ok(&text[start..start + stream.byte_offset()]),
      Some(Err(e)) if e.is_eof() => unterminated = true,
      _ => {}
    }
  }
  Err(if unterminated { ExtractError::Unterminated } else { ExtractError::NoObject })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_known_placeholders_only() {
    assert_eq!(fill_template("{a} et {b} {c}", &[("a", "1"), ("b", "2")]), "1 et 2 {c}");
  }

  #[test]
  fn truncation_respects_multibyte_chars() {
    assert_eq!(trunc_for_log("été", 10), "été");
    assert_eq!(trunc_for_log("ééééé", 2), "éé… (5 chars total)");
  }

  #[test]
  fn extracts_bare_object() {
    assert_eq!(extract_json_object(r#"{"a":1}"#), Ok(r#"{"a":1}"#));
  }

  #[test]
  fn extracts_from_fenced_block() {
    let text = "```json\n{\"questions\": [{\"q\": 1}]}\n```";
    assert_eq!(extract_json_object(text), Ok("{\"questions\": [{\"q\": 1}]}"));
  }

  #[test]
  fn extracts_first_object_from_prose() {
    let text = "Voici le quiz : {\"a\": {\"b\": 2}} et {\"c\": 3}";
    assert_eq!(extract_json_object(text), Ok("{\"a\": {\"b\": 2}}"));
  }

  #[test]
  fn braces_inside_strings_are_ignored() {
    let text = r#"{"question": "Que vaut } ou \" { ?", "n": 1} trailing"#;
    assert_eq!(extract_json_object(text), Ok(r#"{"question": "Que vaut } ou \" { ?", "n": 1}"#));
  }

  #[test]
  fn skips_prose_braces_before_the_object() {
    let text = "Voici le quiz {niveau lycée} :\n```json\n{\"questions\": []}\n```";
    assert_eq!(extract_json_object(text), Ok("{\"questions\": []}"));
  }

  #[test]
  fn failure_modes() {
    assert_eq!(extract_json_object("pas de json ici"), Err(ExtractError::NoObject));
    assert_eq!(extract_json_object("seulement {du texte} ici"), Err(ExtractError::NoObject));
    assert_eq!(extract_json_object("{\"a\": [1, 2"), Err(ExtractError::Unterminated));
  }
}
