//! Error types and HTTP response conversion

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Structured Database Errors
// ============================================================================

/// Database operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseOperation {
    /// Establishing a database connection
    Connect,
    /// Creating a user record
    Insert,
    /// Reading user records
    Query,
    /// Releasing the connection
    Disconnect,
}

impl fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Insert => write!(f, "insert"),
            Self::Query => write!(f, "query"),
            Self::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// Category of database error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseErrorKind {
    /// Failed to establish connection
    ConnectionFailed,
    /// Operation attempted after disconnect (or before connect)
    NotConnected,
    /// Query execution failed
    QueryFailed,
    /// Stored data could not be converted into a record
    TypeConversion,
    /// Operation timed out
    Timeout,
    /// Permission denied
    PermissionDenied,
    /// Other/unknown error
    Other,
}

impl fmt::Display for DatabaseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::NotConnected => write!(f, "not_connected"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Timeout => write!(f, "timeout"),
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured database error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    /// The operation being performed when the error occurred
    pub operation: DatabaseOperation,
    /// The category of error
    pub kind: DatabaseErrorKind,
    /// Human-readable error message (server side only)
    pub message: String,
    /// Additional context (e.g., table name, sanitized URL)
    pub context: Option<String>,
}

impl DatabaseError {
    /// Create a new database error
    pub fn new(
        operation: DatabaseOperation,
        kind: DatabaseErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            DatabaseOperation::Connect,
            DatabaseErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Create an error for an operation attempted without a live connection
    pub fn not_connected(operation: DatabaseOperation) -> Self {
        Self::new(
            operation,
            DatabaseErrorKind::NotConnected,
            "Database connection is not established",
        )
    }

    /// Create a timeout error
    pub fn timeout(operation: DatabaseOperation, message: impl Into<String>) -> Self {
        Self::new(operation, DatabaseErrorKind::Timeout, message)
    }

    /// Add context to an existing error
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Message safe to show to API clients
    pub fn public_message(&self) -> &'static str {
        match self.operation {
            DatabaseOperation::Insert => "Failed to create user",
            DatabaseOperation::Query => "Failed to fetch users",
            DatabaseOperation::Connect => "Database unavailable",
            DatabaseOperation::Disconnect => "Database operation failed",
        }
    }

    /// Error code exposed in API responses
    pub fn code(&self) -> String {
        format!("DATABASE_{}", self.kind.to_string().to_uppercase())
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Database {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref ctx) = self.context {
            write!(f, " [context: {}]", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for DatabaseError {}

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration loaded but holds unusable values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Structured database error with operation context
    #[error("{0}")]
    Database(DatabaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body could not be coerced into a user record (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Request body exceeds the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub message: String,

    /// Machine-readable error code
    pub code: String,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create error response with a code
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            status: status.as_u16(),
        }
    }
}

impl Error {
    /// Status code and body for this error
    fn to_response_parts(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let body = match self {
            Error::Config(_) | Error::InvalidConfig(_) => {
                ErrorResponse::new(status, "CONFIG_ERROR", "Service misconfigured")
            }
            Error::Database(e) => ErrorResponse::new(status, e.code(), e.public_message()),
            Error::Io(_) => ErrorResponse::new(status, "IO_ERROR", "I/O operation failed"),
            Error::BadRequest(msg) => ErrorResponse::new(status, "BAD_REQUEST", msg.clone()),
            Error::ValidationError(msg) => {
                ErrorResponse::new(status, "VALIDATION_ERROR", msg.clone())
            }
            Error::PayloadTooLarge(msg) => {
                ErrorResponse::new(status, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            Error::Internal(_) => {
                ErrorResponse::new(status, "INTERNAL_ERROR", "Internal server error")
            }
        };
        (status, body)
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map an extractor rejection onto the matching variant
    fn from_rejection(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNPROCESSABLE_ENTITY => Error::ValidationError(message),
            StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge(message),
            _ => Error::BadRequest(message),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(e) => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    context = ?e.context,
                    "Database error: {}", e.message
                );
            }
            Error::Config(_) | Error::InvalidConfig(_) | Error::Io(_) | Error::Internal(_) => {
                tracing::error!("{}", self);
            }
            _ => {
                tracing::debug!("Rejected request: {}", self);
            }
        }

        let (status, body) = self.to_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for Error {
    fn from(rejection: FormRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}
