//! Request handlers.

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod tasks;

use hub_core::tasks::FieldErrors;
use hub_core::tasks::schema::NON_FIELD_ERRORS;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Read a JSON request body. An empty body is an empty object; malformed
/// JSON is a field error.
pub(crate) fn parse_json_body(body: &[u8]) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|_| {
        let mut errors = FieldErrors::new();
        errors.insert(
            NON_FIELD_ERRORS.to_string(),
            vec!["Malformed JSON request body.".to_string()],
        );
        AppError::InvalidFields(errors)
    })
}
