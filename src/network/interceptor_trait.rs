// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request/response interceptor trait and chain
//!
//! Interceptors see every request before it is sent and every completed
//! exchange afterwards, including exchanges that failed in the transport.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::http::{Request, ResponseMeta};
use crate::transport::TransportError;

/// What an interceptor sees after an exchange completes
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    /// The request that was sent
    pub request: &'a Request,
    /// Response metadata, absent when the transport failed
    pub response: Option<&'a ResponseMeta>,
    /// Transport failure, if any
    pub error: Option<&'a TransportError>,
}

/// Pre-send / post-receive hook
///
/// # Example
///
/// ```rust,no_run
/// use courier::network::Interceptor;
/// use courier::http::Request;
/// use async_trait::async_trait;
///
/// struct ApiKey(String);
///
/// #[async_trait]
/// impl Interceptor for ApiKey {
///     async fn on_request(&self, request: &mut Request) -> courier::Result<()> {
///         request.set_header("x-api-key", &self.0)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Called before a request is sent. An error aborts the request.
    async fn on_request(&self, _request: &mut Request) -> Result<()> {
        Ok(())
    }

    /// Called after every exchange. May rewrite the body before it is classified.
    async fn on_response(&self, _exchange: &Exchange<'_>, _body: &mut Bytes) -> Result<()> {
        Ok(())
    }

    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Interceptor that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterceptor;

#[async_trait]
impl Interceptor for NoopInterceptor {}

/// Adds a fixed set of headers to every request
#[derive(Debug, Clone, Default)]
pub struct HeaderInjector {
    headers: Vec<(String, String)>,
    /// Hosts to inject into (empty = all)
    domains: Vec<String>,
}

impl HeaderInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Restrict to specific domains
    pub fn for_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    fn applies_to(&self, request: &Request) -> bool {
        if self.domains.is_empty() {
            return true;
        }
        request
            .host()
            .map(|host| self.domains.iter().any(|d| host_matches(host, d)))
            .unwrap_or(false)
    }
}

/// `host` is `domain` itself or one of its subdomains
fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    if domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .map_or(false, |prefix| prefix.ends_with('.'))
}

#[async_trait]
impl Interceptor for HeaderInjector {
    async fn on_request(&self, request: &mut Request) -> Result<()> {
        if !self.applies_to(request) {
            return Ok(());
        }
        for (name, value) in &self.headers {
            request.set_header(name, value)?;
        }
        Ok(())
    }
}

/// Logs requests and responses through `tracing`
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    /// Log request bodies
    pub log_bodies: bool,
    /// Log response bodies
    pub log_responses: bool,
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn on_request(&self, request: &mut Request) -> Result<()> {
        tracing::info!(
            method = %request.method,
            url = %request.url,
            body_len = request.body_len(),
            "Request"
        );

        if self.log_bodies {
            if let Some(ref body) = request.body {
                tracing::debug!(body = ?String::from_utf8_lossy(body), "Request body");
            }
        }

        Ok(())
    }

    async fn on_response(&self, exchange: &Exchange<'_>, body: &mut Bytes) -> Result<()> {
        match (exchange.response, exchange.error) {
            (Some(response), _) => {
                tracing::info!(
                    url = %exchange.request.url,
                    status = %response.status,
                    time_ms = response.response_time_ms,
                    "Response"
                );
            }
            (None, Some(error)) => {
                tracing::warn!(url = %exchange.request.url, error = %error, "Request failed");
            }
            (None, None) => {}
        }

        if self.log_responses && !body.is_empty() {
            tracing::debug!(body = %String::from_utf8_lossy(body), "Response body");
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}

/// Ordered list of interceptors applied to one request
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble the chain for an endpoint.
    ///
    /// Order: endpoint interceptors, configured global interceptors,
    /// client-level interceptors, then the logging interceptor when logging
    /// is enabled. Bypassing drops the global and client-level groups only.
    pub fn for_endpoint(
        endpoint: &Endpoint,
        config: &ClientConfig,
        client_interceptors: &[Arc<dyn Interceptor>],
    ) -> Self {
        let mut chain = Self::new();
        chain.interceptors.extend(endpoint.interceptors.iter().cloned());

        if !endpoint.bypass_global_interceptors {
            chain.interceptors.extend(config.interceptors.iter().cloned());
            chain.interceptors.extend(client_interceptors.iter().cloned());
        }

        if config.logging {
            chain.add(LoggingInterceptor::default());
        }

        chain
    }

    /// Add an interceptor at the end of the chain
    pub fn add<I: Interceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.push(Arc::new(interceptor));
    }

    /// Add a shared interceptor at the end of the chain
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every `on_request` hook in order; the first failure stops the chain
    pub async fn apply_request(&self, request: &mut Request) -> Result<()> {
        for interceptor in &self.interceptors {
            debug!(interceptor = interceptor.name(), url = %request.url, "on_request");
            interceptor.on_request(request).await?;
        }
        Ok(())
    }

    /// Run every `on_response` hook in order; the first failure stops the chain
    pub async fn apply_response(&self, exchange: &Exchange<'_>, body: &mut Bytes) -> Result<()> {
        for interceptor in &self.interceptors {
            debug!(interceptor = interceptor.name(), url = %exchange.request.url, "on_response");
            interceptor.on_response(exchange, body).await?;
        }
        Ok(())
    }
}

/// Interceptor built from a closure over the outgoing request
pub struct FnInterceptor<F>(pub F);

#[async_trait]
impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Request) -> Result<()> + Send + Sync,
{
    async fn on_request(&self, request: &mut Request) -> Result<()> {
        (self.0)(request)
    }
}
