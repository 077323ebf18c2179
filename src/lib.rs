// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Courier - Declarative HTTP Client Core
//!
//! Builds requests from endpoint descriptors, runs them through an
//! interceptor chain, pins TLS peers and recovers from expired credentials
//! with a single-flight token refresh.
//!
//! ## Features
//!
//! - Endpoint descriptors: path, method, query, headers, JSON/multipart/raw bodies
//! - Interceptors: per-endpoint, global and client-level, with optional bypass
//! - SSL pinning: public-key hash or bundled certificate, enforced in the handshake
//! - Token refresh: concurrent 401s share one refresh call, bounded by a retry budget
//! - Transfers: uploads and downloads with byte-level progress callbacks
//!
//! ## Example
//!
//! ```rust,no_run
//! use courier::{ClientConfig, Endpoint, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://api.example.com")?
//!         .refresh_endpoint(Endpoint::post("/auth/refresh").requires_auth(false), 1)
//!         .logging(true);
//!     let client = HttpClient::new(config)?;
//!     client.set_tokens("access-token", Some("refresh-token".to_string()));
//!
//!     let profile: serde_json::Value = client.request(&Endpoint::get("/me")).await?;
//!     println!("{}", profile);
//!
//!     let file = client
//!         .download(&Endpoint::get("/exports/latest.csv"), |fraction| {
//!             println!("{:.0}%", fraction * 100.0);
//!         })
//!         .await?;
//!     println!("saved to {}", file.display());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod network;
pub mod transfer;
pub mod transport;

// Re-exports for convenience

// Endpoints
pub use endpoint::{Encodable, Endpoint, HttpMethod, MultipartBody, Part};

// Configuration
pub use config::{ClientConfig, Pinning, SharedConfig};

// Credentials
pub use auth::{Credentials, RefreshCoordinator, TokenManager};

// Errors
pub use error::{Error, ErrorModel, RequestSummary, Result};

// HTTP
pub use http::{HttpClient, Request, RequestBuilder, Response, ResponseMeta};

// Interceptors
pub use network::{
    Exchange, FnInterceptor, HeaderInjector, Interceptor, InterceptorChain, LoggingInterceptor,
    NoopInterceptor,
};

// Transfers
pub use transfer::{ProgressTracker, TaskId, TransferOutcome};

// Transport
pub use transport::{PinningValidator, ReqwestTransport, Transport, TransportError};

/// Courier version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
