// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! reqwest-backed transport engine

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{Body, Client};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

use super::pinning::{PinMismatch, PinnedCertVerifier, PinningValidator};
use super::{TransferKind, Transport, TransportError};
use crate::config::{ClientConfig, Pinning};
use crate::error::{Error, Result};
use crate::http::{Request, Response, ResponseMeta};
use crate::transfer::{PartialFile, ProgressHandle, ProgressReporter, TransferOutcome};

/// Upload chunk size
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Maximum redirects to follow
const MAX_REDIRECTS: usize = 10;

/// Transport engine on top of `reqwest`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    download_dir: PathBuf,
}

impl ReqwestTransport {
    /// Build the engine for a configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS));

        if let Some(ref pinning) = config.pinning {
            builder = builder.use_preconfigured_tls(pinned_tls_config(pinning)?);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            download_dir: config.download_dir.clone(),
        })
    }

    fn prepare(&self, request: Request) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn execute(
        &self,
        request: Request,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        let url = request.url.clone();
        self.prepare(request)
            .send()
            .await
            .map_err(|e| map_error(&e, &url))
    }

    async fn upload(
        &self,
        mut request: Request,
        progress: ProgressHandle,
    ) -> std::result::Result<TransferOutcome, TransportError> {
        let start = Instant::now();
        let payload = request.body.take().unwrap_or_default();
        let url = request.url.clone();
        let stream = futures::stream::iter(chunked(payload, progress));

        let response = self
            .prepare(request)
            .body(Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| map_error(&e, &url))?;

        let meta = response_meta(&response, start);
        let body = response.bytes().await.map_err(|e| map_error(&e, &url))?;
        Ok(TransferOutcome::Uploaded(Response::new(meta, body)))
    }

    async fn download(
        &self,
        request: Request,
        progress: ProgressHandle,
    ) -> std::result::Result<TransferOutcome, TransportError> {
        let start = Instant::now();
        let url = request.url.clone();
        let response = self.execute(request).await?;
        let meta = response_meta(&response, start);

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                TransportError::Other(format!("cannot create download directory: {}", e))
            })?;
        let file = PartialFile::new(
            self.download_dir.join(format!("{}-{}", Uuid::new_v4(), file_name(&url))),
        );

        let written = stream_to_file(response, file.path(), &url, &progress).await?;
        let location = file.keep();
        debug!(url = %url, bytes = written, location = %location.display(), "download stored");
        Ok(TransferOutcome::Downloaded {
            location,
            response: meta,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> std::result::Result<Response, TransportError> {
        let start = Instant::now();
        let url = request.url.clone();
        let response = self.execute(request).await?;
        let meta = response_meta(&response, start);
        let body = response.bytes().await.map_err(|e| map_error(&e, &url))?;
        trace!(url = %url, status = meta.status.as_u16(), bytes = body.len(), "response received");
        Ok(Response::new(meta, body))
    }

    async fn transfer(&self, request: Request, kind: TransferKind, reporter: ProgressReporter) {
        let progress = reporter.handle();
        let outcome = match kind {
            TransferKind::Upload => self.upload(request, progress).await,
            TransferKind::Download => self.download(request, progress).await,
        };
        if outcome.is_ok() {
            reporter.progress(1.0);
        }
        reporter.finish(outcome);
    }
}

/// rustls client configuration whose only trust anchor is the pin
fn pinned_tls_config(pinning: &Pinning) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let validator = PinningValidator::new(pinning.clone());
    let verifier = PinnedCertVerifier::new(validator, provider.clone());

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Config(format!("TLS configuration: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    Ok(config)
}

/// Split the payload into chunks that report progress as reqwest pulls them
fn chunked(
    payload: Bytes,
    progress: ProgressHandle,
) -> impl Iterator<Item = std::result::Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = payload.len();
    let mut sent = 0usize;
    (0..total).step_by(UPLOAD_CHUNK).map(move |offset| {
        let chunk = payload.slice(offset..(offset + UPLOAD_CHUNK).min(total));
        sent += chunk.len();
        progress.report(sent as f64 / total as f64);
        Ok(chunk)
    })
}

async fn stream_to_file(
    response: reqwest::Response,
    location: &Path,
    url: &Url,
    progress: &ProgressHandle,
) -> std::result::Result<u64, TransportError> {
    let total = response.content_length().filter(|len| *len > 0);
    let mut file = tokio::fs::File::create(location)
        .await
        .map_err(|e| {
            TransportError::Other(format!("cannot create {}: {}", location.display(), e))
        })?;

    let mut received = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| map_error(&e, url))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| TransportError::Other(format!("write failed: {}", e)))?;
        received += chunk.len() as u64;
        if let Some(total) = total {
            progress.report(received as f64 / total as f64);
        }
    }
    file.flush()
        .await
        .map_err(|e| TransportError::Other(format!("write failed: {}", e)))?;

    Ok(received)
}

fn response_meta(response: &reqwest::Response, start: Instant) -> ResponseMeta {
    ResponseMeta::new(
        response.status(),
        response.headers().clone(),
        response.url().clone(),
        start.elapsed().as_millis() as u64,
    )
}

/// Last path segment of the URL, reduced to a safe file name
fn file_name(url: &Url) -> String {
    let name: String = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        "download".to_string()
    } else {
        name
    }
}

fn map_error(err: &reqwest::Error, url: &Url) -> TransportError {
    if let Some(mismatch) = find_pin_mismatch(err) {
        warn!(url = %url, host = %mismatch.host, "handshake aborted by pinning");
        return TransportError::PinningRejected {
            host: mismatch.host,
            reason: mismatch.reason,
        };
    }

    let message = format!("{} ({})", err, url);
    if err.is_timeout() {
        TransportError::Timeout(message)
    } else if err.is_connect() {
        TransportError::Connect(message)
    } else {
        TransportError::Other(message)
    }
}

/// Walk the source chain looking for a pin rejection raised inside rustls
fn find_pin_mismatch(err: &(dyn StdError + 'static)) -> Option<PinMismatch> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(mismatch) = e.downcast_ref::<PinMismatch>() {
            return Some(mismatch.clone());
        }
        if let Some(rustls::Error::Other(other)) = e.downcast_ref::<rustls::Error>() {
            if let Some(mismatch) = other.0.downcast_ref::<PinMismatch>() {
                return Some(mismatch.clone());
            }
        }
        if let Some(inner) = e
            .downcast_ref::<std::io::Error>()
            .and_then(|io| io.get_ref())
        {
            if let Some(mismatch) = find_pin_mismatch(inner) {
                return Some(mismatch);
            }
        }
        current = e.source();
    }
    None
}
