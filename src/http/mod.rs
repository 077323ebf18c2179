// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP layer for Courier
//!
//! Wire request/response types, the endpoint-to-request builder, the
//! response classifier and the client that orchestrates them.

mod builder;
mod classify;
mod client;
mod request;
mod response;

pub use builder::RequestBuilder;
pub use classify::{classify, decode, status_class, Classified, StatusClass};
pub use client::HttpClient;
pub use request::Request;
pub use response::{Response, ResponseMeta};

pub(crate) use client::round_trip;

/// Common HTTP headers
pub mod headers {
    pub const ACCEPT: &str = "accept";
    pub const AUTHORIZATION: &str = "authorization";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const USER_AGENT: &str = "user-agent";
}
