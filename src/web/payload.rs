//! Loose JSON body access for the game endpoints: a missing or malformed body
//! reads as `{}` so handlers answer with their own 400 messages.

use crate::error::AppError;
use axum::Json;
use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn from_body(body: Option<Json<Value>>) -> Self {
        match body {
            Some(Json(Value::Object(map))) => Fields(map),
            _ => Fields::default(),
        }
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty string value.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Any non-null scalar rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.present(key).is_some()
    }

    /// Integer given as a JSON number or an integer string. `Ok(None)` when absent.
    pub fn int(&self, key: &str) -> Result<Option<i64>, AppError> {
        let Some(value) = self.present(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| AppError::bad_request(format!("{key} must be an integer")))
    }

    pub fn int32(&self, key: &str) -> Result<Option<i32>, AppError> {
        match self.int(key)? {
            Some(v) => i32::try_from(v)
                .map(Some)
                .map_err(|_| AppError::bad_request(format!("{key} must be an integer"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        Fields::from_body(Some(Json(v)))
    }

    #[test]
    fn missing_or_non_object_body_is_empty() {
        assert!(!Fields::from_body(None).has("session_id"));
        assert!(!fields(json!([1, 2])).has("session_id"));
    }

    #[test]
    fn integers_accept_numbers_and_numeric_strings() {
        let f = fields(json!({"a": 4, "b": " 12 ", "c": 3.0, "d": "x", "e": null, "f": 2.5}));
        assert_eq!(f.int("a").unwrap(), Some(4));
        assert_eq!(f.int("b").unwrap(), Some(12));
        assert_eq!(f.int("c").unwrap(), Some(3));
        assert!(f.int("d").is_err());
        assert_eq!(f.int("e").unwrap(), None);
        assert!(f.int("f").is_err());
        assert_eq!(f.int("zzz").unwrap(), None);
    }

    #[test]
    fn int32_rejects_overflow() {
        let f = fields(json!({"big": 9_000_000_000_i64}));
        assert!(f.int32("big").is_err());
    }

    #[test]
    fn strings_and_text() {
        let f = fields(json!({"s": "abc", "empty": "", "n": 7, "obj": {}}));
        assert_eq!(f.string("s").as_deref(), Some("abc"));
        assert_eq!(f.string("empty"), None);
        assert_eq!(f.string("n"), None);
        assert_eq!(f.text("n").as_deref(), Some("7"));
        assert_eq!(f.text("empty").as_deref(), Some(""));
        assert_eq!(f.text("obj"), None);
    }
}
