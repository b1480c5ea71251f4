//! Lenient field casting for incoming user payloads
//!
//! Form bodies carry every value as a string and JSON clients are loose about types, so
//! scalar values are cast to the declared field type. Structured values are rejected.

use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Accept a string, number or boolean and keep it as text. `null` means absent.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    string_from_value(value).map_err(D::Error::custom)
}

/// Accept a number, numeric string or boolean. `null` and blank strings mean absent.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    number_from_value(value).map_err(D::Error::custom)
}

fn string_from_value(value: Option<Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(format!("expected a string, found {}", type_name(&other))),
    }
}

fn number_from_value(value: Option<Value>) -> Result<Option<Number>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => storable(n.clone())
            .map(Some)
            .ok_or_else(|| format!("number {} is out of range", n)),
        Some(Value::Bool(b)) => Ok(Some(Number::from(u8::from(b)))),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_number(trimmed)
                .map(Some)
                .ok_or_else(|| format!("expected a number, found \"{}\"", s))
        }
        Some(other) => Err(format!("expected a number, found {}", type_name(&other))),
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Integers beyond `i64` are kept as doubles; the store has no wider integer type.
fn storable(n: Number) -> Option<Number> {
    if n.is_i64() || n.is_f64() {
        Some(n)
    } else {
        n.as_f64().and_then(Number::from_f64)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
