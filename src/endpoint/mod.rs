// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Declarative endpoint descriptors
//!
//! An [`Endpoint`] describes one logical API operation: where it lives,
//! which method it uses, what it sends and how it should be intercepted.
//! Callers typically write one constructor (or one `From` impl) per
//! operation and hand the result to [`HttpClient`](crate::HttpClient).
//!
//! ```rust
//! use courier::Endpoint;
//!
//! let endpoint = Endpoint::get("/users")
//!     .query("page", "2")
//!     .header("x-trace", "abc")
//!     .requires_auth(true);
//! assert_eq!(endpoint.path, "/users");
//! ```

mod multipart;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::network::Interceptor;

pub use multipart::{MultipartBody, Part};

/// HTTP methods an endpoint may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Convert to the wire method
    pub fn as_method(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// A serializable value whose JSON encoding is deferred until the request is built
#[derive(Clone)]
pub struct Encodable(Arc<dyn Fn() -> serde_json::Result<Vec<u8>> + Send + Sync>);

impl Encodable {
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self(Arc::new(move || serde_json::to_vec(&value)))
    }

    /// Encode the value as JSON
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        (self.0)()
    }
}

impl fmt::Debug for Encodable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Encodable(..)")
    }
}

/// Declarative description of one request
#[derive(Clone, Default)]
pub struct Endpoint {
    /// Scheme override; the configured scheme applies when unset
    pub scheme: Option<String>,
    /// Host override; the configured host (and port) apply when unset
    pub host: Option<String>,
    /// Absolute path, starting with `/`
    pub path: String,
    pub method: HttpMethod,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Endpoint headers keyed by lowercase name, overriding configured defaults
    pub headers: HashMap<String, String>,
    /// JSON object parameters
    pub parameters: Option<Map<String, Value>>,
    /// Arbitrary serializable body
    pub encodable: Option<Encodable>,
    /// Multipart form body
    pub multipart: Option<MultipartBody>,
    /// Raw upload payload
    pub upload: Option<Bytes>,
    /// Attach the bearer token when one is stored
    pub requires_auth: bool,
    /// Timeout override
    pub timeout: Option<Duration>,
    /// Interceptors run before the global ones
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    /// Skip global and client interceptors (logging still applies when enabled)
    pub bypass_global_interceptors: bool,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("parameters", &self.parameters)
            .field("encodable", &self.encodable)
            .field("multipart", &self.multipart.as_ref().map(|m| m.parts().len()))
            .field("upload", &self.upload.as_ref().map(|u| u.len()))
            .field("requires_auth", &self.requires_auth)
            .field("timeout", &self.timeout)
            .field("interceptors", &self.interceptors.len())
            .field("bypass_global_interceptors", &self.bypass_global_interceptors)
            .finish()
    }
}

impl Endpoint {
    /// Create an endpoint. Authentication is required by default.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            requires_auth: true,
            ..Default::default()
        }
    }

    /// Create a GET endpoint
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST endpoint
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Create a PUT endpoint
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Create a PATCH endpoint
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Create a DELETE endpoint
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Override the scheme
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Override the host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header; names are case-insensitive and stored lowercase
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        self.headers.insert(name, value.into());
        self
    }

    /// Set a single JSON parameter
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace all JSON parameters
    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Send a serializable value as the JSON body
    pub fn json<T>(mut self, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.encodable = Some(Encodable::new(value));
        self
    }

    /// Send a multipart body
    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.multipart = Some(body);
        self
    }

    /// Set the raw upload payload
    pub fn upload(mut self, payload: impl Into<Bytes>) -> Self {
        self.upload = Some(payload.into());
        self
    }

    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an endpoint-specific interceptor
    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Skip global interceptors for this endpoint
    pub fn bypass_global_interceptors(mut self) -> Self {
        self.bypass_global_interceptors = true;
        self
    }

    /// Whether any body source is set
    pub fn has_body(&self) -> bool {
        self.multipart.is_some()
            || self.parameters.is_some()
            || self.encodable.is_some()
            || self.upload.is_some()
    }
}
