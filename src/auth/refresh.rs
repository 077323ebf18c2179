// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Single-flight token refresh

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::TokenManager;
use crate::config::SharedConfig;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::{classify, round_trip, Classified, RequestBuilder};
use crate::network::InterceptorChain;
use crate::transport::TransportSlot;

type Flight = Shared<BoxFuture<'static, std::result::Result<(), String>>>;

/// Token pair returned by the refresh endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    #[serde(alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
}

#[derive(Default)]
struct FlightSlot {
    generation: u64,
    current: Option<Flight>,
}

/// Clears the in-flight marker when its refresh task ends
struct ClearOnDrop {
    slot: Arc<Mutex<FlightSlot>>,
    generation: u64,
}

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot.generation == self.generation {
            slot.current = None;
        }
    }
}

/// Coalesces concurrent refresh requests into one network call
///
/// Every caller that arrives while a refresh is running awaits that same
/// refresh and observes its outcome. The refresh itself runs on its own
/// task, so it completes and stores tokens even if all callers go away.
#[derive(Clone)]
pub struct RefreshCoordinator {
    config: SharedConfig,
    tokens: TokenManager,
    transport: TransportSlot,
    slot: Arc<Mutex<FlightSlot>>,
}

impl RefreshCoordinator {
    pub fn new(config: SharedConfig, tokens: TokenManager, transport: TransportSlot) -> Self {
        Self {
            config,
            tokens,
            transport,
            slot: Arc::new(Mutex::new(FlightSlot::default())),
        }
    }

    /// Whether a refresh is currently running
    pub fn is_refreshing(&self) -> bool {
        self.slot.lock().current.is_some()
    }

    /// Refresh the credentials, joining any refresh already in flight
    pub async fn refresh(&self) -> Result<()> {
        self.refresh_generation().await.map(|_| ())
    }

    /// Like [`refresh`](Self::refresh), returning the generation of the flight
    /// that was awaited. Callers that joined the same flight see the same number.
    pub async fn refresh_generation(&self) -> Result<u64> {
        let (flight, generation) = self.join_or_start()?;
        flight.await.map_err(Error::TokenRefreshFailed)?;
        Ok(generation)
    }

    fn join_or_start(&self) -> Result<(Flight, u64)> {
        let mut slot = self.slot.lock();
        if let Some(ref flight) = slot.current {
            debug!(generation = slot.generation, "joining in-flight token refresh");
            return Ok((flight.clone(), slot.generation));
        }

        let endpoint = self.config.read().refresh_endpoint.clone().ok_or_else(|| {
            Error::TokenRefreshFailed("no refresh endpoint configured".to_string())
        })?;

        slot.generation += 1;
        let clear = ClearOnDrop {
            slot: self.slot.clone(),
            generation: slot.generation,
        };
        debug!(generation = slot.generation, path = %endpoint.path, "starting token refresh");

        let work = perform_refresh(
            self.config.clone(),
            self.tokens.clone(),
            self.transport.clone(),
            endpoint,
        );
        // The marker is cleared when the work ends, whether or not anyone still waits.
        let task = tokio::spawn(async move {
            let _clear = clear;
            work.await
        });
        let flight = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(format!("refresh task failed: {}", e)),
            }
        }
        .boxed()
        .shared();

        slot.current = Some(flight.clone());
        Ok((flight, slot.generation))
    }
}

async fn perform_refresh(
    config: SharedConfig,
    tokens: TokenManager,
    transport: TransportSlot,
    endpoint: Endpoint,
) -> std::result::Result<(), String> {
    let outcome = exchange_tokens(config, &tokens, transport, endpoint).await;
    match outcome {
        Ok(()) => {
            info!("token refresh succeeded");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed");
            Err(e.to_string())
        }
    }
}

async fn exchange_tokens(
    config: SharedConfig,
    tokens: &TokenManager,
    transport: TransportSlot,
    mut endpoint: Endpoint,
) -> Result<()> {
    let config = config.snapshot();
    if !endpoint.has_body() {
        if let Some(refresh_token) = tokens.refresh_token() {
            endpoint = endpoint.parameter("refreshToken", refresh_token);
        }
    }

    let chain = InterceptorChain::for_endpoint(&endpoint, &config, &[]);
    let request = RequestBuilder::new(&config, tokens)
        .build(&endpoint, &chain)
        .await?;
    let transport = transport.get();
    let response = round_trip(transport.as_ref(), &chain, &request).await?;

    match classify::<TokenPair>(response.status(), &response.body)? {
        Classified::Decoded(pair) => {
            let refresh_token = pair.refresh_token.or_else(|| tokens.refresh_token());
            tokens.set_tokens(pair.access_token, refresh_token);
            Ok(())
        }
        Classified::Unauthorized => Err(Error::unauthorized(&request, response.meta)),
        Classified::CustomFailure(_) => Err(Error::status(&request, response.meta)),
    }
}
