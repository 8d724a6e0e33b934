//! Error types for the material relay

use ark_client::ArkError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ephemeral_material_cache::CacheError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum RelayError {
    BadRequest(String),
    /// Required credential or setting missing
    Config(String),
    /// The ark upload failed
    Upstream(ArkError),
    /// The source image could not be fetched
    Fetch(String),
    NotFound(String),
    Io(Box<std::io::Error>),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            RelayError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RelayError::Upstream(err) => write!(f, "Upload failed: {}", err),
            RelayError::Fetch(msg) => write!(f, "Source fetch failed: {}", msg),
            RelayError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RelayError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Upstream(err) => Some(err),
            RelayError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ArkError> for RelayError {
    fn from(err: ArkError) -> Self {
        if err.is_configuration() {
            RelayError::Config(err.to_string())
        } else {
            RelayError::Upstream(err)
        }
    }
}

impl From<CacheError> for RelayError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(_) => {
                RelayError::NotFound("File does not exist or has expired".to_string())
            }
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for RelayError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        RelayError::Config(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Upstream(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Upstream(_) | RelayError::Fetch(_) => StatusCode::BAD_GATEWAY,
            RelayError::Config(_) | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            RelayError::BadRequest(msg) | RelayError::NotFound(msg) => msg.clone(),
            RelayError::Io(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Internal server error".to_string()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                other.to_string()
            }
        };

        (
            status,
            axum::Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
