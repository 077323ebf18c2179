// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Endpoint to wire request conversion

use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::headers::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use super::Request;
use crate::auth::TokenManager;
use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::network::InterceptorChain;

const JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Turns endpoint descriptors into concrete requests
pub struct RequestBuilder<'a> {
    config: &'a ClientConfig,
    tokens: &'a TokenManager,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ClientConfig, tokens: &'a TokenManager) -> Self {
        Self { config, tokens }
    }

    /// Resolve the endpoint's URL against the configured base
    pub fn url(&self, endpoint: &Endpoint) -> Result<Url> {
        let scheme = endpoint.scheme.as_deref().unwrap_or(&self.config.scheme);
        let (host, port) = match endpoint.host.as_deref() {
            Some(host) => (host, None),
            None => (self.config.host.as_str(), self.config.port),
        };

        if scheme.is_empty() || host.is_empty() {
            return Err(Error::invalid_request(
                "client is not configured: scheme and host are required",
            ));
        }
        if !endpoint.path.is_empty() && !endpoint.path.starts_with('/') {
            return Err(Error::invalid_request(format!(
                "path '{}' must start with '/'",
                endpoint.path
            )));
        }

        let authority = match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let mut url = Url::parse(&format!("{}://{}{}", scheme, authority, endpoint.path))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::invalid_request(format!("'{}' is not a valid request URL", url)));
        }

        if !endpoint.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                endpoint
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }

        Ok(url)
    }

    /// Build the request without running interceptors
    pub fn prepare(&self, endpoint: &Endpoint) -> Result<Request> {
        let mut request = Request::new(endpoint.method.as_method(), self.url(endpoint)?);
        request.timeout = Some(endpoint.timeout.unwrap_or(self.config.timeout));

        for (name, value) in &self.config.default_headers {
            request.set_header(name, value)?;
        }
        for (name, value) in &endpoint.headers {
            request.set_header(name, value)?;
        }

        if endpoint.requires_auth {
            if let Some(token) = self.tokens.access_token() {
                request.set_header(AUTHORIZATION, &format!("Bearer {}", token))?;
            }
        }

        if let Some((body, content_type)) = encode_body(endpoint)? {
            request.set_header(CONTENT_TYPE, &content_type)?;
            request.set_header(CONTENT_LENGTH, &body.len().to_string())?;
            request.body = Some(body);
        }

        debug!(
            method = %request.method,
            url = %request.url,
            body_len = request.body_len(),
            "request built"
        );
        Ok(request)
    }

    /// Build the request and run the chain's pre-send hooks
    pub async fn build(&self, endpoint: &Endpoint, chain: &InterceptorChain) -> Result<Request> {
        let mut request = self.prepare(endpoint)?;
        chain.apply_request(&mut request).await?;
        Ok(request)
    }
}

/// Body and content type; the first configured source wins
fn encode_body(endpoint: &Endpoint) -> Result<Option<(Bytes, String)>> {
    if let Some(ref multipart) = endpoint.multipart {
        return Ok(Some((multipart.encode(), multipart.content_type())));
    }
    if let Some(ref parameters) = endpoint.parameters {
        let body = serde_json::to_vec(parameters).map_err(serialization_error)?;
        return Ok(Some((Bytes::from(body), JSON.to_string())));
    }
    if let Some(ref encodable) = endpoint.encodable {
        let body = encodable.encode().map_err(serialization_error)?;
        return Ok(Some((Bytes::from(body), JSON.to_string())));
    }
    if let Some(ref upload) = endpoint.upload {
        return Ok(Some((upload.clone(), OCTET_STREAM.to_string())));
    }
    Ok(None)
}

fn serialization_error(err: serde_json::Error) -> Error {
    Error::invalid_request(format!("cannot serialize body: {}", err))
}
