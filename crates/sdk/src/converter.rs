use std::{fmt, sync::Arc};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::{
    error::{BindError, ConversionError},
    value::TypeTag,
};

/// Converts raw input values into the representation a declared type expects.
pub trait Converter: Send + Sync {
    /// Returns true if this converter handles the declared type.
    fn supports(&self, ty: &TypeTag) -> bool;

    /// Converts a raw value.
    fn convert(&self, value: Value) -> Result<Value, ConversionError>;
}

/// An ordered collection of converters.
///
/// Lookups are linear and the first converter supporting a type wins, so
/// registration order matters. The registry is assembled once at startup
/// and only read afterwards.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ConverterRegistry {
            converters: Vec::new(),
        }
    }

    /// Creates a registry holding the built-in converters.
    pub fn with_defaults() -> Self {
        ConverterRegistry::new()
            .with(IntConverter)
            .with(FloatConverter)
            .with(BoolConverter)
            .with(StringConverter)
            .with(ListConverter)
            .with(UuidConverter)
            .with(DateTimeConverter)
    }

    /// Appends a converter, builder style.
    pub fn with(mut self, converter: impl Converter + 'static) -> Self {
        self.register(converter);
        self
    }

    /// Appends a converter after those already registered.
    pub fn register(&mut self, converter: impl Converter + 'static) {
        self.converters.push(Arc::new(converter));
    }

    /// Returns the first converter supporting `ty`.
    pub fn find(&self, ty: &TypeTag) -> Result<&dyn Converter, BindError> {
        self.converters
            .iter()
            .find(|converter| converter.supports(ty))
            .map(|converter| converter.as_ref())
            .ok_or(BindError::NoConverterFound { ty: *ty })
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

/// Converts numeric strings, integral floats and booleans to integers.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntConverter;

impl Converter for IntConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::Int
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        let converted = match &value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .map(Value::from)
                .or_else(|| s.trim().parse::<u64>().ok().map(Value::from)),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            Value::Bool(b) => Some(Value::from(i64::from(*b))),
            _ => None,
        };

        converted.ok_or_else(|| ConversionError::new(TypeTag::Int, value, "not an integer"))
    }
}

/// Converts numeric strings and integers to floats.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatConverter;

impl Converter for FloatConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::Float
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        let converted = match &value {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
        .and_then(Number::from_f64)
        .map(Value::Number);

        converted.ok_or_else(|| ConversionError::new(TypeTag::Float, value, "not a number"))
    }
}

/// Converts `"1"`/`"0"`, `"true"`/`"false"`, `"on"`/`"off"` and numbers to booleans.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::Bool
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        let converted = match &value {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(true),
                "0" | "false" | "off" | "no" | "" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        };

        converted
            .map(Value::Bool)
            .ok_or_else(|| ConversionError::new(TypeTag::Bool, value, "not a boolean"))
    }
}

/// Converts scalars to their string representation.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::String
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        match &value {
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::String(_) => Ok(value),
            _ => Err(ConversionError::new(
                TypeTag::String,
                value,
                "not a scalar",
            )),
        }
    }
}

/// Splits comma separated strings into arrays and wraps other scalars.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListConverter;

impl Converter for ListConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::List
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        match value {
            Value::String(s) if s.trim().is_empty() => Ok(Value::Array(Vec::new())),
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            )),
            Value::Object(_) => Err(ConversionError::new(TypeTag::List, value, "not a list")),
            Value::Array(_) => Ok(value),
            other => Ok(Value::Array(vec![other])),
        }
    }
}

/// Validates and normalizes UUIDs for `Named("Uuid")` parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidConverter;

impl Converter for UuidConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::Named("Uuid")
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        let Value::String(s) = &value else {
            return Err(ConversionError::new(
                TypeTag::Named("Uuid"),
                value,
                "expected a string",
            ));
        };

        match Uuid::parse_str(s.trim()) {
            Ok(id) => Ok(Value::String(id.hyphenated().to_string())),
            Err(err) => Err(ConversionError::new(
                TypeTag::Named("Uuid"),
                value,
                err.to_string(),
            )),
        }
    }
}

/// Normalizes timestamps to RFC 3339 for `Named("DateTime")` parameters.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (read as UTC) and unix seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateTimeConverter;

impl Converter for DateTimeConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == TypeTag::Named("DateTime")
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        let parsed = match &value {
            Value::String(s) => {
                let s = s.trim();
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                            .map(|naive| naive.and_utc())
                    })
                    .ok()
            }
            Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
            _ => None,
        };

        parsed
            .map(|dt| Value::String(dt.to_rfc3339()))
            .ok_or_else(|| {
                ConversionError::new(TypeTag::Named("DateTime"), value, "not a date time")
            })
    }
}
