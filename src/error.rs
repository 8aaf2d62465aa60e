use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for pocdesk
#[derive(Error, Debug)]
pub enum PocdeskError {
    /// Store errors (lookup/insert/update against SQLite)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of stored columns
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected before any side effect (bad extension, missing file or identity)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded file could not be decoded in its expected structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Parsing succeeded but produced no candidate records
    #[error("No valid data: {0}")]
    EmptyResult(String),

    /// Identity is not a recognized user
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity is recognized but lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Company or POC not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl PocdeskError {
    /// HTTP status classification for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Parse(_) | Self::EmptyResult(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a client-side failure (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to show an API caller
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::Parse(msg)
            | Self::EmptyResult(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg) => msg.clone(),
            Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Convenient Result type using PocdeskError
pub type Result<T> = std::result::Result<T, PocdeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PocdeskError::Validation("Invalid file type".to_string());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("Invalid file type"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: PocdeskError = rusqlite_err.into();
        assert!(matches!(err, PocdeskError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PocdeskError = io_err.into();
        assert!(matches!(err, PocdeskError::Io(_)));
    }

    #[test]
    fn test_client_errors_map_to_4xx() {
        assert_eq!(PocdeskError::Parse("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PocdeskError::EmptyResult("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PocdeskError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PocdeskError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(PocdeskError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert!(PocdeskError::Validation("x".into()).is_client_error());
        assert!(!PocdeskError::Config("x".into()).is_client_error());
    }
}
