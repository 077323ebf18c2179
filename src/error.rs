// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for Courier
//!
//! Every failure a caller can observe is one of the variants below.
//! Transport-level conditions arrive as [`TransportError`] and are folded
//! into this taxonomy at the client boundary.

use std::fmt;

use thiserror::Error;

use crate::http::{Request, ResponseMeta};
use crate::transport::TransportError;

/// Result type alias for Courier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Courier
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed URL, missing upload payload or body serialization failure.
    /// Never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered 401 and no refresh-retry budget remains
    #[error("Unauthorized: {0}")]
    Unauthorized(Box<ErrorModel>),

    /// Refresh endpoint missing or the refresh request itself failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Response payload did not match the expected shape
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// The TLS peer did not match the configured pin
    #[error("SSL pinning failed for {host}: {reason}")]
    SslPinningFailed { host: String, reason: String },

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Transport timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Transfer abandoned or aborted
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Any other non-2xx status, or an unclassified transport failure (code 0)
    #[error("{0}")]
    Custom(Box<ErrorModel>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error payload carried by [`Error::Custom`] and [`Error::Unauthorized`]
#[derive(Debug, Clone)]
pub struct ErrorModel {
    /// HTTP status code, or 0 for transport failures
    pub code: u16,
    /// Human readable message
    pub message: String,
    /// Response metadata, when a response was received
    pub response: Option<ResponseMeta>,
    /// The request that produced this error
    pub request: Option<RequestSummary>,
}

/// Method and URL of the request an error originated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub method: String,
    pub url: String,
}

impl From<&Request> for RequestSummary {
    fn from(request: &Request) -> Self {
        Self {
            method: request.method.to_string(),
            url: request.url.to_string(),
        }
    }
}

impl fmt::Display for ErrorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.request {
            Some(req) => write!(
                f,
                "{} (code {}, {} {})",
                self.message, self.code, req.method, req.url
            ),
            None => write!(f, "{} (code {})", self.message, self.code),
        }
    }
}

impl ErrorModel {
    /// Create a bare error model
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            response: None,
            request: None,
        }
    }

    /// Attach response metadata
    pub fn with_response(mut self, response: ResponseMeta) -> Self {
        self.response = Some(response);
        self
    }

    /// Attach the originating request
    pub fn with_request(mut self, request: &Request) -> Self {
        self.request = Some(RequestSummary::from(request));
        self
    }
}

impl Error {
    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// Create a custom failure with a status code and message
    pub fn custom(code: u16, message: impl Into<String>) -> Self {
        Error::Custom(Box::new(ErrorModel::new(code, message)))
    }

    /// Create a custom failure for a non-2xx response
    pub fn status(request: &Request, response: ResponseMeta) -> Self {
        let code = response.status.as_u16();
        Error::Custom(Box::new(
            ErrorModel::new(code, format!("Request failed with status {}", code))
                .with_response(response)
                .with_request(request),
        ))
    }

    /// Create an unauthorized error for a 401 response
    pub fn unauthorized(request: &Request, response: ResponseMeta) -> Self {
        Error::Unauthorized(Box::new(
            ErrorModel::new(401, "Unauthorized")
                .with_response(response)
                .with_request(request),
        ))
    }

    /// Fold a transport failure into the public taxonomy
    pub fn from_transport(err: TransportError, request: &Request) -> Self {
        match err {
            TransportError::Timeout(msg) => Error::Timeout(msg),
            TransportError::Cancelled(msg) => Error::Cancelled(msg),
            TransportError::PinningRejected { host, reason } => {
                Error::SslPinningFailed { host, reason }
            }
            TransportError::Connect(msg) => Error::Network(msg),
            TransportError::Other(msg) => {
                Error::Custom(Box::new(ErrorModel::new(0, msg).with_request(request)))
            }
        }
    }

    /// Check if this is an unauthorized error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Check if this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Timeout(_)
                | Error::Cancelled(_)
                | Error::SslPinningFailed { .. }
        ) || matches!(self, Error::Custom(model) if model.code == 0)
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Unauthorized(model) | Error::Custom(model) if model.code != 0 => {
                Some(model.code)
            }
            _ => None,
        }
    }

    /// Get the error model if this error carries one
    pub fn model(&self) -> Option<&ErrorModel> {
        match self {
            Error::Unauthorized(model) | Error::Custom(model) => Some(model),
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidRequest(format!("invalid URL: {}", err))
    }
}
