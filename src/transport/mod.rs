// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport engine boundary
//!
//! The client never talks to sockets directly. It hands concrete
//! [`Request`]s to a [`Transport`], which executes them and, for
//! transfers, reports progress and a terminal outcome through a
//! [`ProgressReporter`].

mod engine;
mod pinning;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::http::{Request, Response};
use crate::transfer::{ProgressReporter, TransferOutcome};

pub use engine::ReqwestTransport;
pub use pinning::{
    leaf_public_key, public_key_hash, PinDecision, PinMismatch, PinnedCertVerifier,
    PinningValidator, RSA_2048_ASN1_HEADER,
};

/// Failures raised by the transport engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The TLS handshake was aborted by the pinning validator
    #[error("certificate pinning rejected {host}: {reason}")]
    PinningRejected { host: String, reason: String },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// Kind of long-running transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Send the request body with byte-level progress
    Upload,
    /// Stream the response body to a file with byte-level progress
    Download,
}

/// Capability to execute HTTP requests
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and buffer the whole response
    async fn send(&self, request: Request) -> Result<Response, TransportError>;

    /// Execute a transfer, reporting progress and exactly one outcome via `reporter`
    async fn transfer(&self, request: Request, kind: TransferKind, reporter: ProgressReporter) {
        let outcome = match kind {
            TransferKind::Upload => self.send(request).await.map(TransferOutcome::Uploaded),
            TransferKind::Download => Err(TransportError::Other(
                "this transport does not support downloads".to_string(),
            )),
        };
        if outcome.is_ok() {
            reporter.progress(1.0);
        }
        reporter.finish(outcome);
    }
}

/// Swappable transport handle shared by the client and the refresh coordinator
#[derive(Clone)]
pub struct TransportSlot(Arc<RwLock<Arc<dyn Transport>>>);

impl TransportSlot {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self(Arc::new(RwLock::new(transport)))
    }

    /// Current transport
    pub fn get(&self) -> Arc<dyn Transport> {
        self.0.read().clone()
    }

    /// Install a new transport; in-flight requests keep the old one
    pub fn replace(&self, transport: Arc<dyn Transport>) {
        *self.0.write() = transport;
    }
}
