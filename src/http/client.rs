// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client orchestrator

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::builder::RequestBuilder;
use super::classify::{decode, status_class, StatusClass};
use super::{Request, Response};
use crate::auth::{RefreshCoordinator, TokenManager};
use crate::config::{ClientConfig, SharedConfig};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::network::{Exchange, Interceptor, InterceptorChain};
use crate::transfer::{
    PartialFile, ProgressCallback, ProgressReporter, ProgressTracker, TaskId, TransferOutcome,
};
use crate::transport::{ReqwestTransport, TransferKind, Transport, TransportError, TransportSlot};

/// How a request is handed to the transport
enum Dispatch {
    Send,
    Upload(Option<ProgressCallback>),
}

/// Refresh-and-retry cycles left for one client
///
/// One unit is spent per completed refresh flight. Requests that joined the
/// same flight share its unit, so the count never drops twice for one refresh.
#[derive(Debug)]
struct RetryBudget {
    remaining: AtomicU32,
    /// Generation of the last refresh flight already paid for
    charged: AtomicU64,
}

impl RetryBudget {
    fn new(budget: u32) -> Self {
        Self {
            remaining: AtomicU32::new(budget),
            charged: AtomicU64::new(0),
        }
    }

    fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    fn reset(&self, budget: u32) {
        self.remaining.store(budget, Ordering::SeqCst);
    }

    /// Pay for a refresh flight; returns false when it was already paid for
    fn charge(&self, generation: u64) -> bool {
        if self.charged.fetch_max(generation, Ordering::SeqCst) >= generation {
            return false;
        }
        match self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => true,
            Err(_) => {
                debug!(generation, "retry budget already exhausted");
                false
            }
        }
    }
}

/// HTTP client
///
/// Cheap to clone; clones share configuration, credentials, the retry
/// budget and the progress tracker.
///
/// ```rust,no_run
/// use courier::{ClientConfig, Endpoint, HttpClient};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn run() -> courier::Result<()> {
/// let client = HttpClient::new(ClientConfig::new("https://api.example.com")?)?;
/// client.set_tokens("access", Some("refresh".to_string()));
/// let users: Vec<User> = client.request(&Endpoint::get("/users")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    config: SharedConfig,
    tokens: TokenManager,
    transport: TransportSlot,
    refresher: RefreshCoordinator,
    tracker: ProgressTracker,
    interceptors: Arc<RwLock<Vec<Arc<dyn Interceptor>>>>,
    retries: Arc<RetryBudget>,
    /// The transport is rebuilt on reconfiguration
    managed_transport: bool,
}

impl HttpClient {
    /// Create a client backed by [`ReqwestTransport`]
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        let mut client = Self::with_transport(config, Arc::new(transport));
        client.managed_transport = true;
        Ok(client)
    }

    /// Create a client on top of a caller-supplied transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let retries = Arc::new(RetryBudget::new(config.refresh_retry_budget));
        let config = SharedConfig::new(config);
        let tokens = TokenManager::new();
        let transport = TransportSlot::new(transport);
        let refresher = RefreshCoordinator::new(config.clone(), tokens.clone(), transport.clone());

        Self {
            config,
            tokens,
            transport,
            refresher,
            tracker: ProgressTracker::new(),
            interceptors: Arc::new(RwLock::new(Vec::new())),
            retries,
            managed_transport: false,
        }
    }

    /// Replace the configuration and reset the retry budget
    ///
    /// Requests already in flight keep the transport they started with.
    pub fn configure(&self, config: ClientConfig) -> Result<()> {
        if self.managed_transport {
            self.transport.replace(Arc::new(ReqwestTransport::new(&config)?));
        }
        info!(
            scheme = %config.scheme,
            host = %config.host,
            retry_budget = config.refresh_retry_budget,
            pinning = config.pinning.is_some(),
            "client configured"
        );
        self.retries.reset(config.refresh_retry_budget);
        self.config.replace(config);
        Ok(())
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> ClientConfig {
        self.config.snapshot()
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Store credentials
    pub fn set_tokens(&self, access_token: impl Into<String>, refresh_token: Option<String>) {
        self.tokens.set_tokens(access_token, refresh_token);
    }

    /// Forget credentials
    pub fn clear_tokens(&self) {
        self.tokens.clear_tokens();
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Add a client-level interceptor, applied after the configured global ones
    pub fn add_interceptor<I: Interceptor + 'static>(&self, interceptor: I) {
        self.interceptors.write().push(Arc::new(interceptor));
    }

    /// Refresh-and-retry cycles left for this client
    pub fn remaining_retries(&self) -> u32 {
        self.retries.remaining()
    }

    /// Refresh credentials now, joining any refresh already in flight
    pub async fn refresh_tokens(&self) -> Result<()> {
        self.refresher.refresh().await
    }

    /// Execute a request and decode the JSON response
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T> {
        let response = self.request_raw(endpoint).await?;
        decode(&response.body)
    }

    /// Execute a request and return the successful response undecoded
    pub async fn request_raw(&self, endpoint: &Endpoint) -> Result<Response> {
        self.execute(Cow::Borrowed(endpoint), Dispatch::Send).await
    }

    /// Upload the endpoint's payload and decode the JSON response
    pub async fn upload<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T> {
        let response = self.execute(upload_endpoint(endpoint)?, Dispatch::Upload(None)).await?;
        decode(&response.body)
    }

    /// Upload with byte-level progress
    pub async fn upload_with_progress<T, F>(&self, endpoint: &Endpoint, on_progress: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(f64) + Send + Sync + 'static,
    {
        let dispatch = Dispatch::Upload(Some(Arc::new(on_progress)));
        let response = self.execute(upload_endpoint(endpoint)?, dispatch).await?;
        decode(&response.body)
    }

    /// Fetch a resource into memory; only `200 OK` yields bytes
    pub async fn download_file(&self, endpoint: &Endpoint) -> Result<Bytes> {
        let (request, chain) = self.build(endpoint, true).await?;
        let transport = self.transport.get();
        let response = round_trip(transport.as_ref(), &chain, &request).await?;

        if response.status() == StatusCode::OK {
            Ok(response.body)
        } else {
            Err(Error::status(&request, response.meta))
        }
    }

    /// Stream a resource to a file with progress; returns the file location
    pub async fn download<F>(&self, endpoint: &Endpoint, on_progress: F) -> Result<PathBuf>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let (request, chain) = self.build(endpoint, true).await?;
        let outcome = self
            .run_transfer(request.clone(), TransferKind::Download, Some(Arc::new(on_progress)))
            .await;

        let (location, meta) = match outcome {
            Ok(TransferOutcome::Downloaded { location, response }) => (location, response),
            Ok(TransferOutcome::Uploaded(_)) => {
                let err = TransportError::Other("transport reported an upload outcome".to_string());
                return Err(transport_failure(&chain, &request, err).await);
            }
            Err(err) => return Err(transport_failure(&chain, &request, err).await),
        };

        // Removed on every early return, including a failing hook.
        let file = PartialFile::new(location);
        let mut body = Bytes::new();
        let exchange = Exchange {
            request: &request,
            response: Some(&meta),
            error: None,
        };
        chain.apply_response(&exchange, &mut body).await?;

        match status_class(meta.status) {
            StatusClass::Success => Ok(file.keep()),
            _ => Err(Error::status(&request, meta)),
        }
    }

    /// Assemble the chain and build the request against the current configuration
    async fn build(
        &self,
        endpoint: &Endpoint,
        resource: bool,
    ) -> Result<(Request, InterceptorChain)> {
        let config = self.config.snapshot();
        let chain = InterceptorChain::for_endpoint(endpoint, &config, &self.interceptors.read());

        let endpoint = if resource && endpoint.timeout.is_none() {
            Cow::Owned(endpoint.clone().timeout(config.resource_timeout))
        } else {
            Cow::Borrowed(endpoint)
        };

        let request = RequestBuilder::new(&config, &self.tokens)
            .build(&endpoint, &chain)
            .await?;
        Ok((request, chain))
    }

    /// Built -> Sent -> Succeeded | AuthRetry -> Sent | Failed
    async fn execute(&self, endpoint: Cow<'_, Endpoint>, dispatch: Dispatch) -> Result<Response> {
        let resource = matches!(dispatch, Dispatch::Upload(_));
        loop {
            let (request, chain) = self.build(&endpoint, resource).await?;
            let outcome = self.dispatch(request.clone(), &dispatch).await;
            let response = finish_exchange(&chain, &request, outcome).await?;

            match status_class(response.status()) {
                StatusClass::Success => return Ok(response),
                StatusClass::Unauthorized if self.remaining_retries() > 0 => {
                    debug!(url = %request.url, "401 received, refreshing credentials");
                    let generation = self.refresher.refresh_generation().await?;
                    let charged = self.retries.charge(generation);
                    debug!(
                        url = %request.url,
                        generation,
                        charged,
                        remaining = self.remaining_retries(),
                        "retrying"
                    );
                }
                StatusClass::Unauthorized => {
                    warn!(url = %request.url, "401 received, retry budget exhausted");
                    return Err(Error::unauthorized(&request, response.meta));
                }
                StatusClass::Failure(_) => return Err(Error::status(&request, response.meta)),
            }
        }
    }

    async fn dispatch(
        &self,
        request: Request,
        dispatch: &Dispatch,
    ) -> std::result::Result<Response, TransportError> {
        match dispatch {
            Dispatch::Send => {
                let transport = self.transport.get();
                transport.send(request).await
            }
            Dispatch::Upload(on_progress) => {
                match self
                    .run_transfer(request, TransferKind::Upload, on_progress.clone())
                    .await?
                {
                    TransferOutcome::Uploaded(response) => Ok(response),
                    TransferOutcome::Downloaded { .. } => Err(TransportError::Other(
                        "transport reported a download outcome".to_string(),
                    )),
                }
            }
        }
    }

    /// Register a progress task, run the transfer and wait for its outcome
    async fn run_transfer(
        &self,
        request: Request,
        kind: TransferKind,
        on_progress: Option<ProgressCallback>,
    ) -> std::result::Result<TransferOutcome, TransportError> {
        let task_id = self.tracker.next_task_id();
        let receiver = self
            .tracker
            .register(task_id, on_progress)
            .map_err(|e| TransportError::Other(e.to_string()))?;
        debug!(task_id = %task_id, kind = ?kind, url = %request.url, "transfer started");

        let reporter = ProgressReporter::new(task_id, self.tracker.clone());
        let transport = self.transport.get();
        let handle = tokio::spawn(async move { transport.transfer(request, kind, reporter).await });
        let mut guard = TransferGuard {
            task_id,
            tracker: self.tracker.clone(),
            abort: Some(handle.abort_handle()),
        };

        let outcome = receiver.await.unwrap_or_else(|_| {
            Err(TransportError::Cancelled("transfer ended without an outcome".to_string()))
        });
        guard.abort = None;
        outcome
    }
}

/// Cancels an abandoned transfer
struct TransferGuard {
    task_id: TaskId,
    tracker: ProgressTracker,
    abort: Option<AbortHandle>,
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            debug!(task_id = %self.task_id, "transfer abandoned by caller");
            abort.abort();
            self.tracker.complete(
                self.task_id,
                Err(TransportError::Cancelled("caller stopped waiting".to_string())),
            );
        }
    }
}

/// The endpoint as uploaded: its payload is the only body
fn upload_endpoint(endpoint: &Endpoint) -> Result<Cow<'_, Endpoint>> {
    match endpoint.upload {
        Some(ref payload) if !payload.is_empty() => {}
        _ => return Err(Error::invalid_request("upload requires a non-empty payload")),
    }

    if endpoint.multipart.is_none()
        && endpoint.parameters.is_none()
        && endpoint.encodable.is_none()
    {
        return Ok(Cow::Borrowed(endpoint));
    }
    let mut endpoint = endpoint.clone();
    endpoint.multipart = None;
    endpoint.parameters = None;
    endpoint.encodable = None;
    Ok(Cow::Owned(endpoint))
}

/// Send one request and run the response hooks; no classification
pub(crate) async fn round_trip(
    transport: &dyn Transport,
    chain: &InterceptorChain,
    request: &Request,
) -> Result<Response> {
    let outcome = transport.send(request.clone()).await;
    finish_exchange(chain, request, outcome).await
}

/// Run the response hooks over a completed exchange, successful or not
pub(crate) async fn finish_exchange(
    chain: &InterceptorChain,
    request: &Request,
    outcome: std::result::Result<Response, TransportError>,
) -> Result<Response> {
    match outcome {
        Ok(mut response) => {
            debug!(
                method = %request.method,
                url = %request.url,
                status = response.status().as_u16(),
                elapsed_ms = response.meta.response_time_ms,
                "exchange completed"
            );
            let exchange = Exchange {
                request,
                response: Some(&response.meta),
                error: None,
            };
            chain.apply_response(&exchange, &mut response.body).await?;
            Ok(response)
        }
        Err(err) => Err(transport_failure(chain, request, err).await),
    }
}

/// Let the response hooks observe a transport failure, then fold it into [`Error`]
///
/// A failing hook replaces the transport error.
async fn transport_failure(
    chain: &InterceptorChain,
    request: &Request,
    err: TransportError,
) -> Error {
    debug!(method = %request.method, url = %request.url, error = %err, "exchange failed");
    let mut body = Bytes::new();
    let exchange = Exchange {
        request,
        response: None,
        error: Some(&err),
    };
    match chain.apply_response(&exchange, &mut body).await {
        Ok(()) => Error::from_transport(err, request),
        Err(hook_error) => hook_error,
    }
}
