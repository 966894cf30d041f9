use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::time::SystemTimeError;

use crate::models::ValidationError;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// No endpoint for this path
    BadRoute,
    /// Origin not in the allow-list
    BadOrigin(String),
    /// Method not accepted on this endpoint
    BadMethod,
    /// Body failed schema validation
    BadData(String),
    /// Endpoint exists but does nothing yet
    Unimplemented,
    /// Configuration error
    ConfigError(String),
    /// Backend answered with a non-success status
    UpstreamError { status: StatusCode, message: String },
    /// HTTP request error (connect, timeout, ...)
    HttpRequest(reqwest::Error),
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRoute => write!(f, "Bad route"),
            Self::BadOrigin(origin) => write!(f, "Bad origin: {:?}", origin),
            Self::BadMethod => write!(f, "Bad method"),
            Self::BadData(msg) => write!(f, "Bad data: {}", msg),
            Self::Unimplemented => write!(f, "Unimplemented"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::UpstreamError { status, message } => {
                write!(f, "Upstream error ({}): {}", status, message)
            }
            Self::HttpRequest(err) => write!(f, "HTTP request error: {}", err),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Clients only ever see the short plain-text reason
        let (status, body) = match &self {
            Self::BadRoute => (StatusCode::BAD_REQUEST, "Bad route"),
            Self::BadOrigin(_) => (StatusCode::BAD_REQUEST, "Bad origin"),
            Self::BadMethod => (StatusCode::BAD_REQUEST, "Bad method"),
            Self::BadData(_) => (StatusCode::BAD_REQUEST, "Bad data"),
            Self::Unimplemented => (StatusCode::NOT_IMPLEMENTED, "Unimplemented"),
            Self::ConfigError(_) | Self::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
            Self::UpstreamError { .. } | Self::HttpRequest(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream error")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, body).into_response()
    }
}

pub fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::BadRoute => "bad_route",
        AppError::BadOrigin(_) => "bad_origin",
        AppError::BadMethod => "bad_method",
        AppError::BadData(_) => "bad_data",
        AppError::Unimplemented => "unimplemented",
        AppError::ConfigError(_) => "config_error",
        AppError::UpstreamError { .. } => "upstream_error",
        AppError::HttpRequest(_) => "http_request_error",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpRequest(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadData(err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadData(err.to_string())
    }
}

/// A tail item that cannot be turned into log entries
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Malformed trace item")]
    MalformedItem(#[source] serde_json::Error),
    #[error("Missing scriptName")]
    MissingScriptName,
    #[error("Missing eventTimestamp")]
    MissingEventTimestamp,
    #[error("Missing event")]
    MissingEvent,
    #[error("Malformed request event")]
    MalformedRequest(#[source] serde_json::Error),
    #[error("Invalid request url {url}")]
    InvalidRequestUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unrecognized event source")]
    UnrecognizedEventSource,
}

impl TranslationError {
    pub fn name(&self) -> &'static str {
        "TranslationError"
    }

    /// `name: message` followed by one line per underlying cause
    pub fn stack(&self) -> String {
        let mut stack = format!("{}: {}", self.name(), self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        stack
    }
}

/// Building the report for a failed translation failed in turn
#[derive(Debug, thiserror::Error)]
pub enum DoubleFaultError {
    #[error("system clock is before the unix epoch")]
    Clock(#[from] SystemTimeError),
}
