// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Client scenarios over a scripted transport

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::{init_tracing, Reply, ScriptedTransport, LEAF_CERT, LEAF_HASH};
use courier::http::Request;
use courier::transport::TransportError;
use courier::{
    ClientConfig, Endpoint, Error, Exchange, HttpClient, Interceptor, Pinning, PinningValidator,
};
use parking_lot::Mutex;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

const TOKENS: &str = r#"{"accessToken":"new-access","refreshToken":"new-refresh"}"#;

fn config() -> ClientConfig {
    ClientConfig::new("https://api.example.com").unwrap()
}

fn refreshing(budget: u32) -> ClientConfig {
    config().refresh_endpoint(Endpoint::post("/auth/refresh"), budget)
}

fn client_with(config: ClientConfig) -> (HttpClient, Arc<ScriptedTransport>) {
    init_tracing();
    let transport = ScriptedTransport::new();
    let client = HttpClient::with_transport(config, transport.clone());
    (client, transport)
}

/// Answers 200 only for the refreshed token
fn secure_route(transport: &ScriptedTransport) {
    transport.on("/secure", |request, _| {
        if request.header("authorization") == Some("Bearer new-access") {
            Reply::ok(r#"{"id":7,"name":"Secure"}"#)
        } else {
            Reply::status(401)
        }
    });
}

struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Interceptor for Recorder {
    async fn on_request(&self, _request: &mut Request) -> courier::Result<()> {
        self.log.lock().push(format!("req:{}", self.label));
        Ok(())
    }

    async fn on_response(&self, exchange: &Exchange<'_>, _body: &mut Bytes) -> courier::Result<()> {
        let kind = if exchange.error.is_some() { "err" } else { "res" };
        self.log.lock().push(format!("{}:{}", kind, self.label));
        Ok(())
    }
}

fn recorder(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
    Recorder {
        label,
        log: log.clone(),
    }
}

#[tokio::test]
async fn test_users_without_token() {
    let (client, transport) = client_with(config());
    transport.respond("/users", Reply::ok(r#"[{"id":1,"name":"A"}]"#));

    let users: Vec<User> = client.request(&Endpoint::get("/users")).await.unwrap();

    assert_eq!(
        users,
        vec![User {
            id: 1,
            name: "A".into()
        }]
    );
    let sent = transport.requests("/users");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url.as_str(), "https://api.example.com/users");
    assert_eq!(sent[0].header("authorization"), None);
}

#[tokio::test]
async fn test_public_endpoint_never_sends_token() {
    let (client, transport) = client_with(config());
    transport.respond("/public", Reply::ok("{}"));
    transport.respond("/private", Reply::ok("{}"));
    client.set_tokens("secret", Some("refresh".into()));

    let _: serde_json::Value = client
        .request(&Endpoint::get("/public").requires_auth(false))
        .await
        .unwrap();
    let _: serde_json::Value = client.request(&Endpoint::get("/private")).await.unwrap();

    assert_eq!(transport.requests("/public")[0].header("authorization"), None);
    assert_eq!(
        transport.requests("/private")[0].header("authorization"),
        Some("Bearer secret")
    );
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let (client, transport) = client_with(
        config().refresh_endpoint(Endpoint::post("/auth/refresh").requires_auth(false), 1),
    );
    secure_route(&transport);
    transport.respond("/auth/refresh", Reply::ok(TOKENS));
    client.set_tokens("expired", Some("old-refresh".into()));

    let user: User = client.request(&Endpoint::get("/secure")).await.unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(transport.calls("/secure"), 2);
    assert_eq!(transport.calls("/auth/refresh"), 1);
    assert_eq!(client.tokens().access_token().as_deref(), Some("new-access"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("new-refresh"));
    assert_eq!(client.remaining_retries(), 0);

    let refresh = &transport.requests("/auth/refresh")[0];
    assert_eq!(refresh.body.as_deref(), Some(&br#"{"refreshToken":"old-refresh"}"#[..]));
}

#[tokio::test]
async fn test_retry_budget_is_per_client() {
    let (client, transport) = client_with(refreshing(1));
    transport.respond("/secure", Reply::status(401));
    transport.respond("/auth/refresh", Reply::ok(TOKENS));

    let first = client.request::<User>(&Endpoint::get("/secure")).await.unwrap_err();
    assert!(first.is_unauthorized());
    assert_eq!(transport.calls("/secure"), 2);
    assert_eq!(transport.calls("/auth/refresh"), 1);

    // The budget is spent; a later 401 surfaces without another refresh.
    let second = client.request::<User>(&Endpoint::get("/secure")).await.unwrap_err();
    assert!(second.is_unauthorized());
    assert_eq!(second.status_code(), Some(401));
    assert_eq!(transport.calls("/secure"), 3);
    assert_eq!(transport.calls("/auth/refresh"), 1);

    // Reconfiguring restores it.
    client
        .configure(refreshing(1))
        .unwrap();
    assert_eq!(client.remaining_retries(), 1);
}

#[tokio::test]
async fn test_budget_allows_one_retry_per_unit() {
    let (client, transport) = client_with(refreshing(3));
    transport.respond("/secure", Reply::status(401));
    transport.respond("/auth/refresh", Reply::ok(TOKENS));

    let err = client.request::<User>(&Endpoint::get("/secure")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(transport.calls("/secure"), 4);
    assert_eq!(transport.calls("/auth/refresh"), 3);
    assert_eq!(client.remaining_retries(), 0);
}

#[tokio::test]
async fn test_abandoned_refresh_does_not_pin_its_outcome() {
    let (client, transport) = client_with(refreshing(1));
    transport.respond("/auth/refresh", Reply::ok(TOKENS));
    transport.delay("/auth/refresh", Duration::from_millis(50));
    client.set_tokens("expired", Some("old-refresh".into()));

    let abandoned = tokio::time::timeout(Duration::from_millis(10), client.refresh_tokens()).await;
    assert!(abandoned.is_err());

    // The refresh still runs to completion without a waiter.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.tokens().access_token().as_deref(), Some("new-access"));

    transport.respond("/auth/refresh", Reply::status(500));
    let err = client.refresh_tokens().await.unwrap_err();
    assert!(matches!(err, Error::TokenRefreshFailed(_)));
    assert_eq!(transport.calls("/auth/refresh"), 2);
}

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let (client, transport) = client_with(refreshing(1));
    secure_route(&transport);
    transport.respond("/auth/refresh", Reply::ok(TOKENS));
    transport.delay("/auth/refresh", Duration::from_millis(100));
    client.set_tokens("expired", Some("old-refresh".into()));

    let endpoint = Endpoint::get("/secure");
    let results =
        futures::future::join_all((0..6).map(|_| client.request::<User>(&endpoint))).await;

    for result in results {
        assert_eq!(result.unwrap().name, "Secure");
    }
    assert_eq!(transport.calls("/auth/refresh"), 1);
    assert_eq!(transport.calls("/secure"), 12);
}

#[tokio::test]
async fn test_refresh_failure_surfaces() {
    let (client, transport) = client_with(refreshing(2));
    transport.respond("/secure", Reply::status(401));
    transport.respond("/auth/refresh", Reply::status(500));

    let err = client.request::<User>(&Endpoint::get("/secure")).await.unwrap_err();
    assert!(matches!(err, Error::TokenRefreshFailed(_)));
    assert_eq!(transport.calls("/secure"), 1);
}

#[tokio::test]
async fn test_unauthorized_without_refresh_endpoint() {
    let (client, transport) = client_with(config());
    transport.respond("/secure", Reply::status(401));

    let err = client.request::<User>(&Endpoint::get("/secure")).await.unwrap_err();
    assert!(matches!(err, Error::TokenRefreshFailed(_)));
}

#[tokio::test]
async fn test_pin_mismatch_rejects_before_any_exchange() {
    let pinning = Pinning::PublicKeyHash("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".into());
    let log = Arc::new(Mutex::new(Vec::new()));
    let (client, transport) = client_with(
        config()
            .pinning(pinning.clone())
            .interceptor(recorder("global", &log)),
    );
    transport.respond("/users", Reply::ok("[]"));
    transport.present_certificate(PinningValidator::new(pinning), LEAF_CERT);

    let err = client.request::<Vec<User>>(&Endpoint::get("/users")).await.unwrap_err();

    assert!(matches!(err, Error::SslPinningFailed { ref host, .. } if host == "api.example.com"));
    assert_eq!(transport.total_calls(), 0);
    assert_eq!(*log.lock(), vec!["req:global", "err:global"]);
}

#[tokio::test]
async fn test_pin_match_allows_exchange() {
    let pinning = Pinning::PublicKeyHash(LEAF_HASH.into());
    let (client, transport) = client_with(config().pinning(pinning.clone()));
    transport.respond("/users", Reply::ok("[]"));
    transport.present_certificate(PinningValidator::new(pinning), LEAF_CERT);

    let users: Vec<User> = client.request(&Endpoint::get("/users")).await.unwrap();
    assert!(users.is_empty());

    let bundled = Pinning::Certificate(Bytes::from_static(LEAF_CERT));
    transport.present_certificate(PinningValidator::new(bundled), LEAF_CERT);
    let users: Vec<User> = client.request(&Endpoint::get("/users")).await.unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn test_interceptor_order_and_bypass() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (client, transport) = client_with(config().interceptor(recorder("global", &log)));
    client.add_interceptor(recorder("client", &log));
    transport.respond("/a", Reply::ok("{}"));

    let _: serde_json::Value = client
        .request(&Endpoint::get("/a").interceptor(recorder("endpoint", &log)))
        .await
        .unwrap();
    assert_eq!(
        *log.lock(),
        vec![
            "req:endpoint",
            "req:global",
            "req:client",
            "res:endpoint",
            "res:global",
            "res:client"
        ]
    );

    log.lock().clear();
    let _: serde_json::Value = client
        .request(
            &Endpoint::get("/a")
                .interceptor(recorder("endpoint", &log))
                .bypass_global_interceptors(),
        )
        .await
        .unwrap();
    assert_eq!(*log.lock(), vec!["req:endpoint", "res:endpoint"]);
}

#[tokio::test]
async fn test_interceptor_failure_aborts_request() {
    struct Deny;

    #[async_trait]
    impl Interceptor for Deny {
        async fn on_request(&self, _request: &mut Request) -> courier::Result<()> {
            Err(Error::invalid_request("denied"))
        }
    }

    let (client, transport) = client_with(config().interceptor(Deny));
    transport.respond("/a", Reply::ok("{}"));

    let err = client.request::<serde_json::Value>(&Endpoint::get("/a")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(ref m) if m == "denied"));
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn test_response_interceptor_rewrites_body() {
    struct Unwrap;

    #[async_trait]
    impl Interceptor for Unwrap {
        async fn on_response(
            &self,
            _exchange: &Exchange<'_>,
            body: &mut Bytes,
        ) -> courier::Result<()> {
            let envelope: serde_json::Value = serde_json::from_slice(body)
                .map_err(|e| Error::Decoding(e.to_string()))?;
            *body = Bytes::from(envelope["data"].to_string());
            Ok(())
        }
    }

    let (client, transport) = client_with(config());
    transport.respond("/wrapped", Reply::ok(r#"{"data":{"id":3,"name":"C"}}"#));

    let user: User = client
        .request(&Endpoint::get("/wrapped").interceptor(Unwrap))
        .await
        .unwrap();
    assert_eq!(user.id, 3);
}

#[tokio::test]
async fn test_transport_errors_map_to_taxonomy() {
    let (client, transport) = client_with(config());
    transport.respond("/slow", Reply::Fail(TransportError::Timeout("30s".into())));
    transport.respond("/reset", Reply::Fail(TransportError::Other("connection reset".into())));
    transport.respond("/down", Reply::Fail(TransportError::Connect("refused".into())));

    let slow = client.request::<()>(&Endpoint::get("/slow")).await.unwrap_err();
    assert!(matches!(slow, Error::Timeout(_)));

    let reset = client.request::<()>(&Endpoint::get("/reset")).await.unwrap_err();
    let model = reset.model().unwrap();
    assert_eq!(model.code, 0);
    assert_eq!(model.message, "connection reset");

    let down = client.request::<()>(&Endpoint::get("/down")).await.unwrap_err();
    assert!(matches!(down, Error::Network(_)));
}

#[tokio::test]
async fn test_decoding_error_is_not_retried() {
    let (client, transport) = client_with(refreshing(1));
    transport.respond("/users", Reply::ok(r#"{"unexpected":true}"#));

    let err = client.request::<Vec<User>>(&Endpoint::get("/users")).await.unwrap_err();
    assert!(matches!(err, Error::Decoding(_)));
    assert_eq!(transport.calls("/users"), 1);
    assert_eq!(transport.calls("/auth/refresh"), 0);
}

#[tokio::test]
async fn test_upload_requires_payload() {
    let (client, transport) = client_with(config());
    transport.respond("/files", Reply::ok("{}"));

    let err = client
        .upload::<serde_json::Value>(&Endpoint::post("/files"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn test_upload_with_progress() {
    let (client, transport) = client_with(config());
    transport.respond("/files", Reply::ok(r#"{"id":9,"name":"report.bin"}"#));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let user: User = client
        .upload_with_progress(
            &Endpoint::post("/files").upload(vec![0u8; 1024]),
            move |fraction| sink.lock().push(fraction),
        )
        .await
        .unwrap();

    assert_eq!(user.id, 9);
    assert_eq!(*seen.lock(), vec![0.25, 0.5, 0.75, 1.0, 1.0]);
    assert!(client.tracker().is_empty());

    let sent = &transport.requests("/files")[0];
    assert_eq!(sent.body_len(), 1024);
    assert_eq!(sent.header("content-type"), Some("application/octet-stream"));
    assert_eq!(sent.timeout, Some(client.config().resource_timeout));
}

#[tokio::test]
async fn test_upload_participates_in_refresh() {
    let (client, transport) = client_with(refreshing(1));
    transport.on("/files", |request, _| {
        if request.header("authorization") == Some("Bearer new-access") {
            Reply::ok("null")
        } else {
            Reply::status(401)
        }
    });
    transport.respond("/auth/refresh", Reply::ok(TOKENS));

    client
        .upload::<()>(&Endpoint::post("/files").upload(vec![1u8, 2, 3]))
        .await
        .unwrap();
    assert_eq!(transport.calls("/files"), 2);
    assert_eq!(transport.calls("/auth/refresh"), 1);
}

#[tokio::test]
async fn test_abandoned_upload_is_cancelled() {
    let (client, transport) = client_with(config());
    transport.respond("/files", Reply::Hang);

    let endpoint = Endpoint::post("/files").upload(vec![1u8]);
    let pending = client.upload::<()>(&endpoint);
    let outcome = tokio::time::timeout(Duration::from_millis(50), pending).await;

    assert!(outcome.is_err());
    assert!(client.tracker().is_empty());
}

#[tokio::test]
async fn test_download_with_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (client, transport) = client_with(config());
    transport.download_into(dir.path().to_path_buf());
    transport.respond("/exports/report.csv", Reply::ok("a,b\n1,2\n"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let location = client
        .download(&Endpoint::get("/exports/report.csv"), move |f| sink.lock().push(f))
        .await
        .unwrap();

    assert!(location.starts_with(dir.path()));
    assert_eq!(std::fs::read_to_string(&location).unwrap(), "a,b\n1,2\n");
    assert_eq!(*seen.lock(), vec![0.5, 1.0]);
    assert!(client.tracker().is_empty());
}

#[tokio::test]
async fn test_download_failure_status_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let (client, transport) = client_with(config());
    transport.download_into(dir.path().to_path_buf());
    transport.respond("/missing", Reply::Status(404, Bytes::from_static(b"not here")));

    let err = client.download(&Endpoint::get("/missing"), |_| {}).await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_hook_failure_removes_file() {
    struct RejectDownloads;

    #[async_trait]
    impl Interceptor for RejectDownloads {
        async fn on_response(
            &self,
            exchange: &Exchange<'_>,
            _body: &mut Bytes,
        ) -> courier::Result<()> {
            match exchange.response {
                Some(_) => Err(Error::invalid_request("quarantined")),
                None => Ok(()),
            }
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let (client, transport) = client_with(config().interceptor(RejectDownloads));
    transport.download_into(dir.path().to_path_buf());
    transport.respond("/exports/report.csv", Reply::ok("a,b\n"));

    let err = client
        .download(&Endpoint::get("/exports/report.csv"), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidRequest(ref m) if m == "quarantined"));
    assert_eq!(transport.calls("/exports/report.csv"), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_file_requires_ok() {
    let (client, transport) = client_with(refreshing(1));
    transport.respond("/blob", Reply::ok("bytes"));
    transport.respond("/created", Reply::Status(201, Bytes::from_static(b"bytes")));
    transport.respond("/locked", Reply::status(401));

    let bytes = client.download_file(&Endpoint::get("/blob")).await.unwrap();
    assert_eq!(&bytes[..], b"bytes");

    let created = client.download_file(&Endpoint::get("/created")).await.unwrap_err();
    assert!(matches!(created, Error::Custom(ref m) if m.code == 201));

    let locked = client.download_file(&Endpoint::get("/locked")).await.unwrap_err();
    assert!(matches!(locked, Error::Custom(ref m) if m.code == 401));
    assert_eq!(transport.calls("/auth/refresh"), 0);
}

#[tokio::test]
async fn test_clear_tokens_is_idempotent() {
    let (client, transport) = client_with(config());
    transport.respond("/me", Reply::ok("{}"));
    client.set_tokens("a", Some("r".into()));

    client.clear_tokens();
    assert!(client.tokens().credentials().is_empty());
    client.clear_tokens();
    assert!(client.tokens().credentials().is_empty());

    let _: serde_json::Value = client.request(&Endpoint::get("/me")).await.unwrap();
    assert_eq!(transport.requests("/me")[0].header("authorization"), None);
}
