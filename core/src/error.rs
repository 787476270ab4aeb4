//! Error types for the agenda API client.
//!
//! # Design
//! A 403 gets its own variant because the backend answers 403 for both a
//! missing session and a failed anti-forgery check, and callers must be
//! able to route either case to a login flow. `NotFound` is split out for
//! update/delete against a stale id. All other non-2xx responses land in
//! `HttpError` with the raw status and body.

use thiserror::Error;

/// Errors returned by `AgendaClient` parse methods and `Session` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 403.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 403 or 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (connection refused, reset,
    /// timeout, unreadable body).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The configured base URL is not a valid absolute URL.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::AuthenticationRequired)
    }

    /// Status code carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthenticationRequired => Some(403),
            ApiError::NotFound => Some(404),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
