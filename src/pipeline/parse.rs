//! Response parsing: model text → JSON object.
//!
//! The prompt asks for bare JSON, but models still wrap answers in
//! ```` ```json ```` fences now and then. The fence is stripped before
//! decoding. Anything that is not a JSON object after that is a malformed
//! response; no attempt is made to repair it.
//!
//! An object carrying an `error` key is the model's way of saying the
//! receipt is unreadable. It decodes fine, so it is returned as
//! [`ModelReply::Unreadable`] and the caller decides what to do with it.

use crate::error::AuditError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Decoded model answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Receipt fields as returned by the model (not yet defaulted).
    Fields(Map<String, Value>),
    /// The model reported the receipt as unreadable; carries its message.
    Unreadable(String),
}

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Return the body of the first code fence in `text`, or the trimmed text.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if text.contains("```") {
        if let Some(caps) = RE_CODE_FENCE.captures(text) {
            if let Some(body) = caps.get(1) {
                return body.as_str();
            }
        }
    }
    text
}

/// Decode the model's raw text.
pub fn parse_model_response(text: &str) -> Result<ModelReply, AuditError> {
    let body = strip_code_fence(text);

    let value: Value =
        serde_json::from_str(body).map_err(|e| AuditError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let Value::Object(mut fields) = value else {
        return Err(AuditError::MalformedResponse {
            detail: "expected a JSON object".into(),
        });
    };

    if let Some(err) = fields.remove("error") {
        let message = match err {
            Value::String(s) => s,
            other => other.to_string(),
        };
        debug!("Model reported unreadable receipt: {}", message);
        return Ok(ModelReply::Unreadable(message));
    }

    Ok(ModelReply::Fields(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(reply: ModelReply) -> Map<String, Value> {
        match reply {
            ModelReply::Fields(f) => f,
            other => panic!("expected fields, got {other:?}"),
        }
    }

    #[test]
    fn plain_json() {
        let f = fields(parse_model_response(r#"{"merchant":"Acme","total":"3.50"}"#).unwrap());
        assert_eq!(f["merchant"], json!("Acme"));
    }

    #[test]
    fn fenced_json_matches_unwrapped() {
        let raw = r#"{"merchant":"Café Ñ","total":"12.00","category":"Travel","justification":"Taxi."}"#;
        let cases = [
            format!("```json\n{raw}\n```"),
            format!("```\n{raw}\n```"),
            format!("  ```json{raw}```  "),
            format!("Here you go:\n```json\n{raw}\n```\nThanks"),
        ];
        let expected = parse_model_response(raw).unwrap();
        for case in cases {
            assert_eq!(parse_model_response(&case).unwrap(), expected, "{case:?}");
        }
    }

    #[test]
    fn unmatched_fence_is_left_alone() {
        assert_eq!(strip_code_fence("```json {\"a\":1}"), "```json {\"a\":1}");
        assert!(matches!(
            parse_model_response("```json {\"a\":1}"),
            Err(AuditError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn prose_is_malformed() {
        let err = parse_model_response("The merchant is Acme and the total is $3.").unwrap_err();
        assert!(matches!(err, AuditError::MalformedResponse { .. }));
        assert_eq!(err.to_string(), "Invalid AI JSON response");
    }

    #[test]
    fn non_object_is_malformed() {
        for text in ["[1, 2]", "\"Acme\"", "42", "null"] {
            assert!(
                matches!(
                    parse_model_response(text),
                    Err(AuditError::MalformedResponse { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn error_key_is_unreadable() {
        let reply = parse_model_response(
            "```json\n{\"error\": \"Could not read receipt. Please upload a clearer image.\"}\n```",
        )
        .unwrap();
        assert_eq!(
            reply,
            ModelReply::Unreadable("Could not read receipt. Please upload a clearer image.".into())
        );
    }

    #[test]
    fn error_key_wins_over_fields() {
        let reply = parse_model_response(r#"{"merchant":"Acme","error":{"code":7}}"#).unwrap();
        assert_eq!(reply, ModelReply::Unreadable(r#"{"code":7}"#.into()));
    }
}
