use std::{fmt, io};
use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::services::store::StoreError;

/// Custom error types for the wiki application
#[derive(Debug)]
pub enum WikiError {
    Io(io::Error),
    /// A title-bearing route received a title that fails validation
    InvalidTitle,
    NotFound,
    InvalidPath,
    /// The article store could not be reached or did not answer in time
    Unavailable(String),
    /// A template fragment failed while being rendered for a request
    RenderError(String),
    /// A template fragment could not be loaded at startup
    TemplateError(String),
    Config(String),
}

impl From<io::Error> for WikiError {
    fn from(err: io::Error) -> Self {
        WikiError::Io(err)
    }
}

impl From<StoreError> for WikiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => WikiError::NotFound,
            StoreError::Unavailable(msg) => WikiError::Unavailable(msg),
        }
    }
}

impl fmt::Display for WikiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WikiError::Io(e) => write!(f, "I/O error: {}", e),
            WikiError::InvalidTitle => f.write_str("Invalid title"),
            WikiError::NotFound => f.write_str("Not found"),
            WikiError::InvalidPath => f.write_str("Invalid path"),
            WikiError::Unavailable(e) => write!(f, "Storage unavailable: {}", e),
            WikiError::RenderError(e) => write!(f, "Render error: {}", e),
            WikiError::TemplateError(e) => write!(f, "Template error: {}", e),
            WikiError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for WikiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WikiError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for WikiError {
    fn into_response(self) -> Response {
        let status = match self {
            // Invalid titles look exactly like missing pages to the client
            WikiError::InvalidTitle | WikiError::NotFound => StatusCode::NOT_FOUND,
            WikiError::InvalidPath => StatusCode::BAD_REQUEST,
            WikiError::Io(_)
            | WikiError::Unavailable(_)
            | WikiError::RenderError(_)
            | WikiError::TemplateError(_)
            | WikiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
