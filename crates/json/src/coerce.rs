//! Coercion between loosely-typed JSON tokens and typed property values.

use serde_json::{Number, Value};

use adstore_core::{DataAccessError, DataAccessResult, PropertyType, PropertyValue};

/// Candidate types for an unschematized bare (unquoted) token.
pub const BARE_PRECEDENCE: [PropertyType; 5] = [
    PropertyType::Bool,
    PropertyType::Double,
    PropertyType::Date,
    PropertyType::Guid,
    PropertyType::String,
];

/// Candidate types for an unschematized quoted token. Numbers and booleans in
/// quotes are not promoted.
pub const QUOTED_PRECEDENCE: [PropertyType; 3] =
    [PropertyType::Date, PropertyType::Guid, PropertyType::String];

/// Try to read `value` as `ty`. `null` never coerces.
pub fn try_coerce(ty: PropertyType, value: &Value) -> Option<PropertyValue> {
    match (ty, value) {
        (_, Value::Null) => None,
        (PropertyType::String, Value::String(s)) => Some(PropertyValue::String(s.clone())),
        (PropertyType::String, Value::Number(n)) => Some(PropertyValue::String(n.to_string())),
        (PropertyType::String, Value::Bool(b)) => Some(PropertyValue::String(b.to_string())),
        // Structured documents are carried as their JSON text.
        (PropertyType::String, Value::Object(_) | Value::Array(_)) => {
            Some(PropertyValue::String(value.to_string()))
        }
        (_, Value::String(s)) => PropertyValue::parse(ty, s).ok(),
        (PropertyType::Bool, Value::Bool(b)) => Some(PropertyValue::Bool(*b)),
        (PropertyType::Int32, Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(PropertyValue::Int32),
        (PropertyType::Int64, Value::Number(n)) => n.as_i64().map(PropertyValue::Int64),
        (PropertyType::Double, Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(PropertyValue::Double),
        _ => None,
    }
}

/// First type of the precedence list the token coerces into.
pub fn try_infer(value: &Value) -> Option<PropertyValue> {
    let precedence: &[PropertyType] = match value {
        Value::String(_) => &QUOTED_PRECEDENCE,
        _ => &BARE_PRECEDENCE,
    };
    precedence.iter().find_map(|ty| try_coerce(*ty, value))
}

/// JSON form of a property value.
///
/// Strings whose trimmed text opens an object or array are embedded as
/// structure when they parse.
pub fn to_json_value(value: &PropertyValue) -> DataAccessResult<Value> {
    let json = match value {
        PropertyValue::Bool(v) => Value::Bool(*v),
        PropertyValue::Int32(v) => Value::Number(Number::from(*v)),
        PropertyValue::Int64(v) => Value::Number(Number::from(*v)),
        PropertyValue::Double(v) => Value::Number(Number::from_f64(*v).ok_or_else(|| {
            DataAccessError::invalid_argument(format!("{v} cannot be represented in JSON"))
        })?),
        PropertyValue::Date(_) | PropertyValue::Guid(_) | PropertyValue::Binary(_) => {
            Value::String(value.serialization_value())
        }
        PropertyValue::String(s) => embedded_document(s).unwrap_or_else(|| Value::String(s.clone())),
    };
    Ok(json)
}

fn embedded_document(s: &str) -> Option<Value> {
    let trimmed = s.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    match serde_json::from_str::<Value>(s) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        _ => None,
    }
}
