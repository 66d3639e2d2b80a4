//! Answer presentation
//!
//! A presenter turns an answer or an error into the bytes a client sees.
//! The CLI uses [`JsonPresenter`]: one JSON object per line.

use serde_json::{json, Value};

use super::answer::Answer;
use super::errors::EngineError;

/// Renders answers for a client
pub trait Presenter: Send + Sync {
    fn render(&self, answer: &Answer) -> String;

    fn render_error(&self, error: &EngineError) -> String;
}

/// One-line JSON envelopes: `{"status":"ok","data":..}` or
/// `{"status":"error","code":..,"message":..}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPresenter;

impl JsonPresenter {
    /// Wraps any serializable payload in the success envelope
    pub fn ok(data: Value) -> String {
        json!({"status": "ok", "data": data}).to_string()
    }

    /// Error envelope with a stable code and a user-facing message
    pub fn error(code: &str, message: &str) -> String {
        json!({"status": "error", "code": code, "message": message}).to_string()
    }
}

impl Presenter for JsonPresenter {
    fn render(&self, answer: &Answer) -> String {
        match serde_json::to_value(answer) {
            Ok(data) => Self::ok(data),
            Err(e) => Self::error("TQ_INTERNAL", &format!("could not serialize answer: {}", e)),
        }
    }

    fn render_error(&self, error: &EngineError) -> String {
        Self::error(error.kind(), &error.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::PlanningError;

    #[test]
    fn test_error_envelope() {
        let line = JsonPresenter.render_error(&EngineError::from(PlanningError::unresolvable(3, "prose")));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "TQ_PLAN_UNRESOLVABLE");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_ok_envelope() {
        let value: Value = serde_json::from_str(&JsonPresenter::ok(json!({"n": 1}))).unwrap();
        assert_eq!(value, json!({"status": "ok", "data": {"n": 1}}));
    }
}
