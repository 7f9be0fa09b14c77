use serde_json::Value;
use thiserror::Error;

use crate::value::TypeTag;

/// Error returned when an operation handler rejects or fails an operation.
#[derive(Clone, Debug, Error)]
#[error("{code}: {message}")]
pub struct OperationError {
    /// The error classification
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

/// Classification of operation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ErrorCode {
    /// Business rule violation - the operation was understood but rejected.
    /// Example: "Attribute group is not a color group"
    #[error("rejected")]
    Rejected,

    /// The input was malformed or invalid.
    /// Example: "Client name cannot be empty"
    #[error("invalid_input")]
    InvalidInput,

    /// The entity the operation targets does not exist.
    #[error("not_found")]
    NotFound,

    /// An unexpected error occurred in the handler.
    #[error("internal")]
    Internal,
}

impl OperationError {
    /// Create a rejection error for business rule violations.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Rejected,
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: message.into(),
        }
    }
}

/// Error raised while turning an input bag into an operation.
///
/// All variants describe malformed request input and are never retried.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("required parameter {parameter} of {operation} is not present")]
    MissingRequiredParameter {
        operation: &'static str,
        parameter: &'static str,
    },
    #[error("converter for type {ty} not found")]
    NoConverterFound { ty: TypeTag },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("invalid value for parameter {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

impl BindError {
    /// Short machine readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BindError::MissingRequiredParameter { .. } => "missing_required_parameter",
            BindError::NoConverterFound { .. } => "no_converter_found",
            BindError::Conversion(_) => "conversion_failed",
            BindError::InvalidParameter { .. } => "invalid_parameter",
        }
    }
}

/// A converter claimed a type but could not convert the given value.
#[derive(Clone, Debug, Error)]
#[error("cannot convert {value} to {ty}: {reason}")]
pub struct ConversionError {
    pub ty: TypeTag,
    pub value: Value,
    pub reason: String,
}

impl ConversionError {
    pub fn new(ty: TypeTag, value: Value, reason: impl Into<String>) -> Self {
        ConversionError {
            ty,
            value,
            reason: reason.into(),
        }
    }
}

/// Error returned by the operation bus.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no handler registered for {operation}")]
    HandlerNotFound { operation: &'static str },
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Error during result normalization/denormalization.
#[derive(Clone, Debug, Error)]
#[error("(de)serialization error: {message}")]
pub struct SerializationError {
    pub message: String,
}

impl SerializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Error returned by [`OperationProvider::provide`](crate::provider::OperationProvider::provide).
#[derive(Debug, Error)]
pub enum ProvideError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
