//! Declarative request schemas for task payloads.
//!
//! Each task declares its fields as a static slice of [`FieldSpec`].
//! [`validate`] checks a JSON payload against it and either returns typed
//! [`TaskInput`] or a field-keyed map of error messages. Unknown fields
//! (such as `api_key`) are ignored.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

/// Key used for errors not tied to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_INTEGER: &str = "A valid integer is required.";

/// Field name → messages, serialized as the 400 response body.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Type and constraints of one field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text; whitespace is trimmed before the blank check.
    Text { allow_blank: bool },
    /// Whole number with optional inclusive bounds. Integer strings are accepted.
    Integer { min: Option<i64>, max: Option<i64> },
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
    /// List of text items.
    TextList,
}

/// Whether a field must be supplied.
#[derive(Debug, Clone, Copy)]
pub enum Presence {
    Required,
    Optional,
    Default(DefaultValue),
}

/// Default applied when an optional field is absent.
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Text(&'static str),
    Integer(i64),
}

/// One declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Required,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
        }
    }

    pub const fn with_default(name: &'static str, kind: FieldKind, default: DefaultValue) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Default(default),
        }
    }
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    TextList(Vec<String>),
}

/// Validated payload of one task request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    values: HashMap<&'static str, FieldValue>,
}

impl TaskInput {
    /// Text value of a field (text and choice fields).
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer value of a field.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// List value of a field.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(FieldValue::TextList(items)) => Some(items),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: impl IntoIterator<Item = (&'static str, FieldValue)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
        }
    }
}

/// Validate `payload` against `fields`.
pub fn validate(fields: &[FieldSpec], payload: &Value) -> Result<TaskInput, FieldErrors> {
    let Value::Object(object) = payload else {
        let mut errors = FieldErrors::new();
        errors.insert(
            NON_FIELD_ERRORS.to_string(),
            vec![format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(payload)
            )],
        );
        return Err(errors);
    };

    let mut input = TaskInput::default();
    let mut errors = FieldErrors::new();
    for spec in fields {
        match validate_field(spec, object) {
            Ok(Some(value)) => {
                input.values.insert(spec.name, value);
            }
            Ok(None) => {}
            Err(messages) => {
                errors.insert(spec.name.to_string(), messages);
            }
        }
    }

    if errors.is_empty() {
        Ok(input)
    } else {
        Err(errors)
    }
}

fn validate_field(
    spec: &FieldSpec,
    object: &Map<String, Value>,
) -> Result<Option<FieldValue>, Vec<String>> {
    match object.get(spec.name) {
        None => match spec.presence {
            Presence::Required => Err(vec![REQUIRED.to_string()]),
            Presence::Optional => Ok(None),
            Presence::Default(DefaultValue::Text(s)) => Ok(Some(FieldValue::Text(s.to_string()))),
            Presence::Default(DefaultValue::Integer(n)) => Ok(Some(FieldValue::Integer(n))),
        },
        Some(Value::Null) => Err(vec![NOT_NULL.to_string()]),
        Some(value) => coerce(spec.kind, value).map(Some),
    }
}

fn coerce(kind: FieldKind, value: &Value) -> Result<FieldValue, Vec<String>> {
    match kind {
        FieldKind::Text { allow_blank } => {
            let text = as_text(value).ok_or_else(|| vec![NOT_STRING.to_string()])?;
            if text.is_empty() && !allow_blank {
                return Err(vec![NOT_BLANK.to_string()]);
            }
            Ok(FieldValue::Text(text))
        }
        FieldKind::Integer { min, max } => {
            let n = as_integer(value).ok_or_else(|| vec![NOT_INTEGER.to_string()])?;
            let mut messages = Vec::new();
            if let Some(max) = max
                && n > max
            {
                messages.push(format!("Ensure this value is less than or equal to {max}."));
            }
            if let Some(min) = min
                && n < min
            {
                messages.push(format!("Ensure this value is greater than or equal to {min}."));
            }
            if messages.is_empty() {
                Ok(FieldValue::Integer(n))
            } else {
                Err(messages)
            }
        }
        FieldKind::Choice(choices) => {
            let raw = as_text(value).unwrap_or_else(|| value.to_string());
            if choices.contains(&raw.as_str()) {
                Ok(FieldValue::Text(raw))
            } else {
                Err(vec![format!("\"{raw}\" is not a valid choice.")])
            }
        }
        FieldKind::TextList => {
            let Value::Array(items) = value else {
                return Err(vec![format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type_name(value)
                )]);
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match as_text(item) {
                    Some(text) if !text.is_empty() => out.push(text),
                    Some(_) => return Err(vec![format!("Item {index}: {NOT_BLANK}")]),
                    None => return Err(vec![format!("Item {index}: {NOT_STRING}")]),
                }
            }
            Ok(FieldValue::TextList(out))
        }
    }
}

/// Strings are trimmed; numbers are accepted in their JSON text form.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::required("text", FieldKind::Text { allow_blank: false }),
        FieldSpec::with_default(
            "count",
            FieldKind::Integer {
                min: Some(1),
                max: Some(10),
            },
            DefaultValue::Integer(5),
        ),
        FieldSpec::with_default(
            "mode",
            FieldKind::Choice(&["fast", "slow"]),
            DefaultValue::Text("fast"),
        ),
        FieldSpec::optional("tags", FieldKind::TextList),
    ];

    #[test]
    fn defaults_fill_missing_optional_fields() {
        let input = validate(FIELDS, &json!({"text": "hello"})).unwrap();
        assert_eq!(input.text("text"), Some("hello"));
        assert_eq!(input.integer("count"), Some(5));
        assert_eq!(input.text("mode"), Some("fast"));
        assert_eq!(input.list("tags"), None);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let errors = validate(FIELDS, &json!({})).unwrap_err();
        assert_eq!(errors["text"], vec![REQUIRED.to_string()]);
    }

    #[test]
    fn blank_and_null_text_are_rejected() {
        let errors = validate(FIELDS, &json!({"text": "   "})).unwrap_err();
        assert_eq!(errors["text"], vec![NOT_BLANK.to_string()]);
        let errors = validate(FIELDS, &json!({"text": null})).unwrap_err();
        assert_eq!(errors["text"], vec![NOT_NULL.to_string()]);
    }

    #[test]
    fn integer_bounds_are_enforced() {
        let errors = validate(FIELDS, &json!({"text": "x", "count": 50})).unwrap_err();
        assert_eq!(
            errors["count"],
            vec!["Ensure this value is less than or equal to 10.".to_string()]
        );
        let errors = validate(FIELDS, &json!({"text": "x", "count": 0})).unwrap_err();
        assert!(errors["count"][0].contains("greater than or equal to 1"));
    }

    #[test]
    fn integer_strings_are_accepted_and_garbage_is_not() {
        let input = validate(FIELDS, &json!({"text": "x", "count": "3"})).unwrap();
        assert_eq!(input.integer("count"), Some(3));
        let errors = validate(FIELDS, &json!({"text": "x", "count": "three"})).unwrap_err();
        assert_eq!(errors["count"], vec![NOT_INTEGER.to_string()]);
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let errors = validate(FIELDS, &json!({"text": "x", "mode": "medium"})).unwrap_err();
        assert_eq!(
            errors["mode"],
            vec!["\"medium\" is not a valid choice.".to_string()]
        );
    }

    #[test]
    fn list_items_must_be_text() {
        let input = validate(FIELDS, &json!({"text": "x", "tags": ["a", "b"]})).unwrap();
        assert_eq!(input.list("tags"), Some(&["a".to_string(), "b".to_string()][..]));
        let errors = validate(FIELDS, &json!({"text": "x", "tags": "a"})).unwrap_err();
        assert!(errors["tags"][0].contains("Expected a list"));
        assert!(validate(FIELDS, &json!({"text": "x", "tags": [{}]})).is_err());
    }

    #[test]
    fn every_bad_field_is_reported_together() {
        let errors = validate(FIELDS, &json!({"count": true, "mode": "x"})).unwrap_err();
        assert_eq!(
            errors.keys().collect::<Vec<_>>(),
            vec!["count", "mode", "text"]
        );
    }

    #[test]
    fn non_object_payload_is_a_non_field_error() {
        let errors = validate(FIELDS, &json!(["text"])).unwrap_err();
        assert!(errors[NON_FIELD_ERRORS][0].contains("got list"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let input = validate(FIELDS, &json!({"text": "x", "api_key": "sk_abc"})).unwrap();
        assert_eq!(input.text("text"), Some("x"));
    }
}
