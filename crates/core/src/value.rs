//! Typed property values and their canonical serialization strings.

use core::fmt;
use core::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DataAccessError, DataAccessResult};

/// Declared kind of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Bool,
    Int32,
    Int64,
    Double,
    Date,
    Guid,
    String,
    Binary,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Bool => "Bool",
            PropertyType::Int32 => "Int32",
            PropertyType::Int64 => "Int64",
            PropertyType::Double => "Double",
            PropertyType::Date => "Date",
            PropertyType::Guid => "Guid",
            PropertyType::String => "String",
            PropertyType::Binary => "Binary",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = DataAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "Bool" => PropertyType::Bool,
            "Int32" => PropertyType::Int32,
            "Int64" => PropertyType::Int64,
            "Double" => PropertyType::Double,
            "Date" => PropertyType::Date,
            "Guid" => PropertyType::Guid,
            "String" => PropertyType::String,
            "Binary" => PropertyType::Binary,
            other => {
                return Err(DataAccessError::invalid_argument(format!(
                    "unknown property type '{other}'"
                )));
            }
        };
        Ok(ty)
    }
}

/// A property value of one of the supported kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Date(DateTime<Utc>),
    Guid(Uuid),
    String(String),
    Binary(Vec<u8>),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::Int32(_) => PropertyType::Int32,
            PropertyValue::Int64(_) => PropertyType::Int64,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::Date(_) => PropertyType::Date,
            PropertyValue::Guid(_) => PropertyType::Guid,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Binary(_) => PropertyType::Binary,
        }
    }

    /// Canonical text form, used for backend encoding and regex filtering.
    pub fn serialization_value(&self) -> String {
        match self {
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::Int32(v) => v.to_string(),
            PropertyValue::Int64(v) => v.to_string(),
            PropertyValue::Double(v) => v.to_string(),
            PropertyValue::Date(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            PropertyValue::Guid(v) => v.hyphenated().to_string(),
            PropertyValue::String(v) => v.clone(),
            PropertyValue::Binary(v) => BASE64.encode(v),
        }
    }

    /// Rebuild a value of `ty` from its serialization string.
    pub fn parse(ty: PropertyType, text: &str) -> DataAccessResult<Self> {
        let mismatch = || {
            DataAccessError::invalid_argument(format!("'{text}' is not a valid {ty} value"))
        };
        let value = match ty {
            PropertyType::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" => PropertyValue::Bool(true),
                "false" => PropertyValue::Bool(false),
                _ => return Err(mismatch()),
            },
            PropertyType::Int32 => PropertyValue::Int32(text.trim().parse().map_err(|_| mismatch())?),
            PropertyType::Int64 => PropertyValue::Int64(text.trim().parse().map_err(|_| mismatch())?),
            PropertyType::Double => {
                let v: f64 = text.trim().parse().map_err(|_| mismatch())?;
                if !v.is_finite() {
                    return Err(mismatch());
                }
                PropertyValue::Double(v)
            }
            PropertyType::Date => PropertyValue::Date(
                DateTime::parse_from_rfc3339(text.trim())
                    .map_err(|_| mismatch())?
                    .with_timezone(&Utc),
            ),
            PropertyType::Guid => {
                PropertyValue::Guid(Uuid::parse_str(text.trim()).map_err(|_| mismatch())?)
            }
            PropertyType::String => PropertyValue::String(text.to_string()),
            PropertyType::Binary => {
                PropertyValue::Binary(BASE64.decode(text.trim()).map_err(|_| mismatch())?)
            }
        };
        Ok(value)
    }

    /// Convert this value to `ty`, going through the serialization string.
    ///
    /// Fails with `InvalidArgument` when the value cannot be represented as `ty`.
    pub fn coerce_to(&self, ty: PropertyType) -> DataAccessResult<Self> {
        if self.property_type() == ty {
            return Ok(self.clone());
        }
        Self::parse(ty, &self.serialization_value())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int64(v) => Some(*v),
            PropertyValue::Int32(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            PropertyValue::Guid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Binary(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialization_value())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Date(value)
    }
}

impl From<Uuid> for PropertyValue {
    fn from(value: Uuid) -> Self {
        PropertyValue::Guid(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Binary(value)
    }
}
