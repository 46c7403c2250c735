//! Error types for the todo API client.
//!
//! # Design
//! `Unauthorized` and `NotFound` get dedicated variants because callers react
//! to them differently: a 401 resets the session, a 404 means the item is
//! gone. Every other non-2xx response lands in `HttpError` with the raw status
//! code and body; `is_client_error` / `is_server_error` split that bucket into
//! validation and server failures. Nothing here is retried automatically.

use thiserror::Error;

/// Errors returned by the client, the session and the synchronizer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 401, or no bearer token was available to send.
    #[error("unauthorized")]
    Unauthorized,

    /// The server returned 404: the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The persisted token could not be read, written or removed.
    #[error("token storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// `submit_edit` was called with no edit draft open.
    #[error("no todo is open for editing")]
    NoDraft,
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// A 4xx rejection other than 401/404, typically a validation failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::HttpError { status, .. } if (400..500).contains(status))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::HttpError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_buckets() {
        let validation = ApiError::HttpError {
            status: 422,
            body: String::new(),
        };
        assert!(validation.is_client_error());
        assert!(!validation.is_server_error());

        let server = ApiError::HttpError {
            status: 503,
            body: String::new(),
        };
        assert!(server.is_server_error());
        assert!(!server.is_client_error());

        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::NotFound.is_client_error());
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = ApiError::HttpError {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}
