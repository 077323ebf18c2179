// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Shared test harness: a scripted in-memory transport

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use courier::http::{Request, Response, ResponseMeta};
use courier::transfer::{ProgressReporter, TransferOutcome};
use courier::transport::{PinDecision, PinningValidator, TransferKind, Transport, TransportError};
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

pub const LEAF_CERT: &[u8] = include_bytes!("../fixtures/api.example.com.der");
pub const LEAF_HASH: &str = "CbduU6FAVmaOJ3QBc3VKXKSfNnMwsZJZL7VcjCKiA6w=";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Handler = Arc<dyn Fn(&Request, usize) -> Reply + Send + Sync>;

/// Scripted reply for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Bytes),
    Fail(TransportError),
    /// Never answers
    Hang,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, Bytes::copy_from_slice(body.as_bytes()))
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, Bytes::new())
    }
}

struct Route {
    handler: Handler,
    delay: Duration,
}

/// In-memory transport answering per path, recording every request
///
/// With a server certificate installed, every call first goes through the
/// pin check the way a TLS handshake would.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<Request>>,
    tls: Mutex<Option<(PinningValidator, Vec<u8>)>>,
    download_dir: Mutex<Option<PathBuf>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer a path with a handler receiving the request and its call index
    pub fn on<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, usize) -> Reply + Send + Sync + 'static,
    {
        self.routes.lock().insert(
            path.to_string(),
            Route {
                handler: Arc::new(handler),
                delay: Duration::ZERO,
            },
        );
    }

    /// Always answer a path with the same reply
    pub fn respond(&self, path: &str, reply: Reply) {
        self.on(path, move |_, _| reply.clone());
    }

    /// Answer successive calls in order; the last reply repeats
    pub fn sequence(&self, path: &str, replies: Vec<Reply>) {
        self.on(path, move |_, index| {
            replies[index.min(replies.len() - 1)].clone()
        });
    }

    /// Delay every answer on a path
    pub fn delay(&self, path: &str, delay: Duration) {
        if let Some(route) = self.routes.lock().get_mut(path) {
            route.delay = delay;
        }
    }

    /// Present this certificate and enforce the validator, like a pinned handshake
    pub fn present_certificate(&self, validator: PinningValidator, leaf: &[u8]) {
        *self.tls.lock() = Some((validator, leaf.to_vec()));
    }

    pub fn download_into(&self, dir: PathBuf) {
        *self.download_dir.lock() = Some(dir);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.url.path() == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn requests(&self, path: &str) -> Vec<Request> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.url.path() == path)
            .cloned()
            .collect()
    }

    async fn reply(&self, request: &Request) -> Reply {
        let rejection = self
            .tls
            .lock()
            .as_ref()
            .and_then(|(validator, leaf)| match validator.evaluate(leaf) {
                PinDecision::Trust => None,
                PinDecision::Reject(reason) => Some(reason),
            });
        if let Some(reason) = rejection {
            return Reply::Fail(TransportError::PinningRejected {
                host: request.host().unwrap_or_default().to_string(),
                reason,
            });
        }

        let path = request.url.path().to_string();
        let index = {
            let mut calls = self.calls.lock();
            let index = calls.iter().filter(|r| r.url.path() == path).count();
            calls.push(request.clone());
            index
        };

        let (handler, delay) = match self.routes.lock().get(&path) {
            Some(route) => (route.handler.clone(), route.delay),
            None => return Reply::status(404),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        handler(request, index)
    }
}

fn response(request: &Request, code: u16, body: Bytes) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    headers.insert("content-length", body.len().into());
    Response::new(ResponseMeta::new(status, headers, request.url.clone(), 1), body)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        match self.reply(&request).await {
            Reply::Status(code, body) => Ok(response(&request, code, body)),
            Reply::Fail(err) => Err(err),
            Reply::Hang => futures::future::pending().await,
        }
    }

    async fn transfer(&self, request: Request, kind: TransferKind, reporter: ProgressReporter) {
        if kind == TransferKind::Upload {
            for step in 1..=4 {
                reporter.progress(step as f64 / 4.0);
            }
        }

        let outcome = match self.reply(&request).await {
            Reply::Hang => futures::future::pending().await,
            Reply::Fail(err) => Err(err),
            Reply::Status(code, body) => match kind {
                TransferKind::Upload => {
                    Ok(TransferOutcome::Uploaded(response(&request, code, body)))
                }
                TransferKind::Download => {
                    let dir = self
                        .download_dir
                        .lock()
                        .clone()
                        .unwrap_or_else(std::env::temp_dir);
                    let location = dir.join(format!("scripted-{}", reporter.task_id()));
                    reporter.progress(0.5);
                    match tokio::fs::write(&location, &body).await {
                        Ok(()) => Ok(TransferOutcome::Downloaded {
                            location,
                            response: response(&request, code, Bytes::new()).meta,
                        }),
                        Err(e) => Err(TransportError::Other(e.to_string())),
                    }
                }
            },
        };

        if outcome.is_ok() {
            reporter.progress(1.0);
        }
        reporter.finish(outcome);
    }
}
