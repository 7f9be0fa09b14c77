use std::fmt;

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header::IntoHeaderName},
    response::{IntoResponse, Response},
};
use opbind_sdk::error::{
    BindError, DispatchError, ErrorCode, OperationError, ProvideError, SerializationError,
};
use serde::Serialize;

#[derive(Debug)]
pub struct Error {
    status_code: StatusCode,
    headers: HeaderMap,
    status: ErrorStatus,
    code: String,
    message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Client sent invalid/malformed input (400)
    InvalidInput,

    /// Resource not found (404)
    NotFound,

    /// Valid request but business rules rejected it (422)
    Rejected,

    /// Server-side error (500)
    Internal,

    /// The route has no operation handler (501)
    NotImplemented,
}

impl ErrorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::InvalidInput => "invalid_input",
            ErrorStatus::NotFound => "not_found",
            ErrorStatus::Rejected => "rejected",
            ErrorStatus::Internal => "internal",
            ErrorStatus::NotImplemented => "not_implemented",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorStatus::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorStatus::NotFound => StatusCode::NOT_FOUND,
            ErrorStatus::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorStatus::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorStatus::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Error {
    pub fn new(status: ErrorStatus, code: impl Into<String>) -> Self {
        Error {
            status_code: status.status_code(),
            headers: HeaderMap::new(),
            status,
            code: code.into(),
            message: None,
        }
    }

    pub fn with_status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_header(mut self, key: impl IntoHeaderName, val: impl Into<HeaderValue>) -> Self {
        self.headers.insert(key, val.into());
        self
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            status: &'static str,
            code: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            message: Option<String>,
        }

        (
            self.status_code,
            self.headers,
            Json(Body {
                status: self.status.as_str(),
                code: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<ProvideError> for Error {
    fn from(err: ProvideError) -> Self {
        match err {
            ProvideError::Bind(err) => err.into(),
            ProvideError::Dispatch(err) => err.into(),
            ProvideError::Serialization(err) => err.into(),
        }
    }
}

impl From<BindError> for Error {
    fn from(err: BindError) -> Self {
        Error::new(ErrorStatus::InvalidInput, err.code()).with_message(err.to_string())
    }
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::HandlerNotFound { .. } => {
                Error::new(ErrorStatus::NotImplemented, "handler_not_found")
                    .with_message(err.to_string())
            }
            DispatchError::Operation(err) => err.into(),
            DispatchError::Serialization(err) => err.into(),
        }
    }
}

impl From<OperationError> for Error {
    fn from(err: OperationError) -> Self {
        let status = match err.code {
            ErrorCode::Rejected => ErrorStatus::Rejected,
            ErrorCode::InvalidInput => ErrorStatus::InvalidInput,
            ErrorCode::NotFound => ErrorStatus::NotFound,
            ErrorCode::Internal => ErrorStatus::Internal,
        };

        Error::new(status, format!("operation_{}", err.code)).with_message(err.message)
    }
}

impl From<SerializationError> for Error {
    fn from(err: SerializationError) -> Self {
        Error::new(ErrorStatus::Internal, "serialization_error").with_message(err.message)
    }
}

#[cfg(test)]
mod tests {
    use opbind_sdk::value::TypeTag;

    use super::*;

    #[test]
    fn bind_errors_are_client_errors() {
        let err: Error = BindError::MissingRequiredParameter {
            operation: "GetAttributeForEditing",
            parameter: "attributeId",
        }
        .into();
        assert_eq!(err.status(), ErrorStatus::InvalidInput);
        assert_eq!(err.code(), "missing_required_parameter");

        let err: Error = BindError::NoConverterFound {
            ty: TypeTag::Named("Money"),
        }
        .into();
        assert_eq!(err.status().status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "no_converter_found");
    }

    #[test]
    fn operation_errors_map_by_code() {
        let err: Error = OperationError::not_found("Attribute not found").into();
        assert_eq!(err.status(), ErrorStatus::NotFound);
        assert_eq!(err.code(), "operation_not_found");

        let err: Error = OperationError::rejected("Group is not a color group").into();
        assert_eq!(err.status().status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "operation_rejected");
    }

    #[test]
    fn missing_handler_is_not_implemented() {
        let err: Error = ProvideError::Dispatch(DispatchError::HandlerNotFound {
            operation: "AddAttribute",
        })
        .into();
        assert_eq!(err.status().status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(err.code(), "handler_not_found");
    }
}
