//! Turns a raw request body into a [`DateRangeRequest`].
//!
//! Three checks run in order and the first failure wins:
//! the body must be a JSON object, `StartOn` and `EndOn` must both be present as
//! `YYYY-MM-DD` strings naming real days, and `StartOn` must not be later than `EndOn`.
//! Unknown fields are ignored.

use crate::domain::model::{DateRangeRequest, DATE_FORMAT};
use crate::utils::error::{Result, TimeEntryError};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const START_ON_FIELD: &str = "StartOn";
pub const END_ON_FIELD: &str = "EndOn";

fn date_shape() -> &'static Regex {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    DATE_SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"))
}

pub fn parse_payload(body: &str) -> Result<DateRangeRequest> {
    let object = parse_object(body)?;

    let start_on = read_date_field(&object, START_ON_FIELD)?;
    let end_on = read_date_field(&object, END_ON_FIELD)?;

    DateRangeRequest::new(start_on, end_on)
}

fn parse_object(body: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TimeEntryError::MalformedPayload {
            message: e.to_string(),
        })?;

    match value {
        Value::Object(object) => Ok(object),
        other => Err(TimeEntryError::MalformedPayload {
            message: format!("expected a JSON object, got {}", json_type_name(&other)),
        }),
    }
}

fn read_date_field(object: &Map<String, Value>, field: &str) -> Result<NaiveDate> {
    let raw = match object.get(field) {
        None => {
            return Err(TimeEntryError::SchemaViolation {
                field: field.to_string(),
                message: "required field is missing".to_string(),
            })
        }
        Some(Value::String(raw)) => raw,
        Some(other) => {
            return Err(TimeEntryError::SchemaViolation {
                field: field.to_string(),
                message: format!("expected a date string, got {}", json_type_name(other)),
            })
        }
    };

    if !date_shape().is_match(raw) {
        return Err(TimeEntryError::SchemaViolation {
            field: field.to_string(),
            message: format!("'{}' is not in YYYY-MM-DD format", raw),
        });
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| TimeEntryError::SchemaViolation {
        field: field.to_string(),
        message: format!("'{}' is not a calendar date: {}", raw, e),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
