//! Attribute casts and value encoding.
//!
//! The same cast rules apply to base-row columns and to translation values, so
//! an override decodes to exactly what the base row would have produced.

use crate::error::{Result, TranslatorError};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// How an attribute is stored and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeCast {
    /// Plain text.
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    /// Structured data stored as serialized JSON.
    Json,
}

impl AttributeCast {
    pub fn is_json(self) -> bool {
        matches!(self, AttributeCast::Json)
    }
}

/// A value counts as empty when it is not a boolean, not structured, and its
/// string form trims to nothing. Writing an empty value clears an override.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Array(_) | Value::Object(_) | Value::Number(_) => false,
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
    }
}

/// Encode a value into the text stored in a translation record.
pub fn encode(cast: AttributeCast, attribute: &str, value: &Value) -> Result<String> {
    if cast.is_json() {
        return Ok(serde_json::to_string(value)?);
    }

    match value {
        Value::Array(_) | Value::Object(_) => {
            Err(TranslatorError::UncastStructuredValue(attribute.to_string()))
        }
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(if *flag { "1" } else { "0" }.to_string()),
        Value::Null => Ok(String::new()),
    }
}

/// Decode stored text back into a value according to the attribute cast.
pub fn decode(cast: AttributeCast, text: &str) -> Result<Value> {
    let value = match cast {
        AttributeCast::Json => serde_json::from_str(text)?,
        AttributeCast::String => Value::String(text.to_string()),
        // A fractional number in an integer column reads back as a number,
        // the same as a REAL stored in the base row.
        AttributeCast::Integer => match text.trim().parse::<i64>() {
            Ok(number) => Value::from(number),
            Err(_) => decode_float(text),
        },
        AttributeCast::Float => decode_float(text),
        AttributeCast::Boolean => {
            let normalized = text.trim().to_ascii_lowercase();
            Value::Bool(!matches!(normalized.as_str(), "" | "0" | "false"))
        }
    };
    Ok(value)
}

fn decode_float(text: &str) -> Value {
    match text.trim().parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => Value::Number(number),
        None => Value::String(text.to_string()),
    }
}

/// Map an attribute value onto a base-row column value.
pub fn to_sql(cast: AttributeCast, value: &Value) -> Result<SqlValue> {
    if cast.is_json() {
        return Ok(match value {
            Value::Null => SqlValue::Null,
            other => SqlValue::Text(serde_json::to_string(other)?),
        });
    }

    let sql = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => SqlValue::Real(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(serde_json::to_string(value)?),
    };
    Ok(sql)
}

/// Read a base-row column value, applying the attribute cast.
pub fn from_sql(cast: AttributeCast, value: ValueRef<'_>) -> Result<Value> {
    let value = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => match cast {
            AttributeCast::Boolean => Value::Bool(integer != 0),
            AttributeCast::String => Value::String(integer.to_string()),
            _ => Value::from(integer),
        },
        ValueRef::Real(real) => match cast {
            AttributeCast::String => Value::String(real.to_string()),
            _ => Number::from_f64(real).map(Value::Number).unwrap_or(Value::Null),
        },
        ValueRef::Text(bytes) => decode(cast, &String::from_utf8_lossy(bytes))?,
        ValueRef::Blob(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    };
    Ok(value)
}
