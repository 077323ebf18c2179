// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response classification

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Coarse status class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200..=299
    Success,
    /// 401, candidate for refresh-and-retry
    Unauthorized,
    /// Any other status
    Failure(u16),
}

pub fn status_class(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Unauthorized,
        code => StatusClass::Failure(code),
    }
}

/// Classification of a response for a requested output type
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<T> {
    Decoded(T),
    Unauthorized,
    CustomFailure(u16),
}

/// Classify a status and decode the body on success
pub fn classify<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<Classified<T>> {
    match status_class(status) {
        StatusClass::Success => decode(body).map(Classified::Decoded),
        StatusClass::Unauthorized => Ok(Classified::Unauthorized),
        StatusClass::Failure(code) => Ok(Classified::CustomFailure(code)),
    }
}

/// Decode a JSON body. An empty body decodes as `null`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| Error::Decoding(e.to_string()))
}
