// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Client configuration
//!
//! [`ClientConfig`] is built once at startup and handed to the client.
//! [`SharedConfig`] is the handle every component reads it through; only
//! [`HttpClient::configure`](crate::HttpClient::configure) replaces it.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{RwLock, RwLockReadGuard};
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::headers;
use crate::network::Interceptor;

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// SSL pinning mode
#[derive(Clone, PartialEq, Eq)]
pub enum Pinning {
    /// Base64 SHA-256 of the leaf certificate's RSA-2048 public key (with ASN.1 header)
    PublicKeyHash(String),
    /// DER bytes of the expected leaf certificate
    Certificate(Bytes),
}

impl fmt::Debug for Pinning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pinning::PublicKeyHash(hash) => f.debug_tuple("PublicKeyHash").field(hash).finish(),
            Pinning::Certificate(der) => write!(f, "Certificate({} bytes)", der.len()),
        }
    }
}

impl Pinning {
    /// Load a bundled certificate from disk (DER or PEM)
    pub fn certificate_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            Error::Config(format!("cannot read certificate {}: {}", path.display(), e))
        })?;
        Ok(Pinning::Certificate(Bytes::from(pem_to_der(&raw)?)))
    }
}

/// First certificate of a PEM file, or the input itself when it is DER
///
/// Text around the PEM sections (OpenSSL `subject=` or `Bag Attributes`
/// lines) is skipped. Later certificates in a bundle are ignored.
fn pem_to_der(raw: &[u8]) -> Result<Vec<u8>> {
    if !raw.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
        return Ok(raw.to_vec());
    }

    let mut reader = BufReader::new(Cursor::new(raw));
    let first = rustls_pemfile::certs(&mut reader)
        .next()
        .ok_or_else(|| Error::Config("no certificate found in PEM data".to_string()))?
        .map_err(|e| Error::Config(format!("invalid PEM certificate: {}", e)))?;
    Ok(first.as_ref().to_vec())
}

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// URL scheme
    pub scheme: String,
    /// Base host
    pub host: String,
    /// Port, when not the scheme default
    pub port: Option<u16>,
    /// SSL pinning, if any
    pub pinning: Option<Pinning>,
    /// Endpoint used to refresh expired credentials
    pub refresh_endpoint: Option<Endpoint>,
    /// Headers sent with every request, keyed by lowercase name
    pub default_headers: HashMap<String, String>,
    /// Global interceptors, in registration order
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    /// Refresh-and-retry cycles allowed per client
    pub refresh_retry_budget: u32,
    /// Default timeout
    pub timeout: Duration,
    /// Timeout for uploads and downloads
    pub resource_timeout: Duration,
    /// Enable the logging interceptor
    pub logging: bool,
    /// Where downloaded files are written
    pub download_dir: PathBuf,
    /// User agent string
    pub user_agent: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("pinning", &self.pinning)
            .field("refresh_endpoint", &self.refresh_endpoint.as_ref().map(|e| &e.path))
            .field("default_headers", &self.default_headers)
            .field("interceptors", &self.interceptors.len())
            .field("refresh_retry_budget", &self.refresh_retry_budget)
            .field("timeout", &self.timeout)
            .field("resource_timeout", &self.resource_timeout)
            .field("logging", &self.logging)
            .field("download_dir", &self.download_dir)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(headers::ACCEPT.to_string(), "application/json".to_string());

        Self {
            scheme: "https".to_string(),
            host: String::new(),
            port: None,
            pinning: None,
            refresh_endpoint: None,
            default_headers,
            interceptors: Vec::new(),
            refresh_retry_budget: 1,
            timeout: Duration::from_secs(30),
            resource_timeout: Duration::from_secs(300),
            logging: false,
            download_dir: std::env::temp_dir().join("courier-downloads"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a config from a base URL such as `https://api.example.com`
    pub fn new(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config(format!("base URL '{}' has no host", base_url)))?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port(),
            ..Default::default()
        })
    }

    /// Set the base host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set SSL pinning
    pub fn pinning(mut self, pinning: Pinning) -> Self {
        self.pinning = Some(pinning);
        self
    }

    /// Set the refresh endpoint and how many refresh-retry cycles are allowed
    pub fn refresh_endpoint(mut self, endpoint: Endpoint, retry_budget: u32) -> Self {
        self.refresh_endpoint = Some(endpoint);
        self.refresh_retry_budget = retry_budget;
        self
    }

    /// Add default header; names are case-insensitive and stored lowercase
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        self.default_headers.insert(name, value.into());
        self
    }

    /// Add a global interceptor
    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout for uploads and downloads
    pub fn resource_timeout(mut self, timeout: Duration) -> Self {
        self.resource_timeout = timeout;
        self
    }

    /// Enable/disable request logging
    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Set the download directory
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Host and scheme must be set before any request is issued
    pub fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() || self.host.is_empty() {
            return Err(Error::invalid_request(
                "client is not configured: scheme and host are required",
            ));
        }
        Ok(())
    }
}

/// Shared, replaceable configuration handle
#[derive(Clone, Default)]
pub struct SharedConfig(Arc<RwLock<ClientConfig>>);

impl SharedConfig {
    pub fn new(config: ClientConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Borrow the current configuration
    pub fn read(&self) -> RwLockReadGuard<'_, ClientConfig> {
        self.0.read()
    }

    /// Clone the current configuration
    pub fn snapshot(&self) -> ClientConfig {
        self.0.read().clone()
    }

    /// Replace the configuration atomically
    pub fn replace(&self, config: ClientConfig) {
        *self.0.write() = config;
    }
}
