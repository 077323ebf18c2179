// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP response types

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

/// Response metadata: everything except the body
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// Response status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Final URL
    pub url: Url,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

impl ResponseMeta {
    /// Create response metadata
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, response_time_ms: u64) -> Self {
        Self {
            status,
            headers,
            url,
            response_time_ms,
        }
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get content length
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }
}

/// HTTP response representation
#[derive(Debug, Clone)]
pub struct Response {
    /// Status, headers and URL
    pub meta: ResponseMeta,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response
    pub fn new(meta: ResponseMeta, body: impl Into<Bytes>) -> Self {
        Self {
            meta,
            body: body.into(),
        }
    }

    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.meta.status
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.meta.status.is_success()
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.meta.header(name)
    }

    /// Get body as text, lossy conversion
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
