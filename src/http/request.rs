// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Wire request representation

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use crate::error::{Error, Result};

/// A concrete request, ready for the transport engine
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Bytes>,
    /// Request timeout
    pub timeout: Option<Duration>,
}

impl Request {
    /// Create a new request with no headers and no body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Set a header, replacing any previous value
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::try_from(name)
            .map_err(|e| Error::invalid_request(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::try_from(value).map_err(|e| {
            Error::invalid_request(format!("invalid value for header '{}': {}", name, e))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Get a header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set the request body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Body length in bytes
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    /// Get the URL as string
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Get the host
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }
}
