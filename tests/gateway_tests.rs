/// End-to-end tests: requests go through the full router and shipments land
/// on a mock Telegraf/Loki server
use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ingest_gateway::{
    config::{AnalyticsConfig, BackendsConfig, Config, ServerConfig, TailConfig},
    handlers::AppState,
    server::{create_router, serve},
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn create_test_config(upstream: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8787,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        },
        analytics: AnalyticsConfig {
            origins: vec![
                "https://dietcode.io".to_string(),
                "https://blob.city".to_string(),
            ],
        },
        backends: BackendsConfig {
            telegraf_url: format!("{}/telegraf", upstream),
            loki_url: format!("{}/loki", upstream),
            client_id: "ingest-id".to_string(),
            client_secret: "ingest-secret".to_string(),
            timeout_seconds: 5,
        },
        tail: TailConfig::default(),
    }
}

async fn setup() -> (MockServer, Router) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let state = AppState::new(Arc::new(ArcSwap::from_pointee(create_test_config(&server.uri()))));
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let app = create_router(state, Arc::new(recorder.handle()));

    (server, app)
}

/// Shipping happens in the background, so poll until `count` requests arrived
async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..100 {
        let received = server.received_requests().await.unwrap();
        if received.len() >= count {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Expected {} upstream requests", count);
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn body_text(request: &wiremock::Request) -> String {
    String::from_utf8(request.body.clone()).unwrap()
}

#[tokio::test]
async fn test_metric_is_shipped_to_telegraf() {
    let (server, app) = setup().await;

    let response = app
        .oneshot(post_json(
            "/m",
            json!({
                "name": "request",
                "service": "blob-city",
                "method": "PUT",
                "path": "/tunnel",
                "status": 101,
                "fields": { "rayId": "abcd", "tunnelId": "1234", "peerId": "1" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let received = wait_for_requests(&server, 1).await;
    let upstream = &received[0];
    assert_eq!(upstream.url.path(), "/telegraf");
    assert_eq!(upstream.headers["cf-access-client-id"], "ingest-id");
    assert_eq!(upstream.headers["cf-access-client-secret"], "ingest-secret");
    assert!(body_text(upstream).starts_with(
        r#"request,bucket=metrics,environment=production,service=blob-city,method=PUT,path=/tunnel,status=101 rayId="abcd",tunnelId="1234",peerId="1" "#
    ));
}

#[tokio::test]
async fn test_log_batch_is_shipped_to_loki() {
    let (server, app) = setup().await;

    let response = app
        .oneshot(post_json(
            "/l",
            json!({
                "service": "blob-city",
                "kv": { "rayId": "1234" },
                "logs": [{
                    "level": "fatal",
                    "timestamp": { "v": "001" },
                    "message": "Incoming request",
                    "kv": { "method": "GET" }
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let received = wait_for_requests(&server, 1).await;
    assert_eq!(received[0].url.path(), "/loki");
    assert_eq!(received[0].headers["content-type"], "application/json");
    assert_eq!(
        body_text(&received[0]),
        r#"{"streams":[{"stream":{"environment":"production","service":"blob-city","level":"fatal"},"values":[["001000000","rayId=\"1234\" method=\"GET\" msg=\"Incoming request\""]]}]}"#
    );
}

#[tokio::test]
async fn test_analytics_is_shipped_with_cors_headers() {
    let (server, app) = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/a")
        .header("Origin", "https://dietcode.io")
        .header("CF-Connecting-IP", "1.1.1.1")
        .header("User-Agent", "user-agent")
        .header("CF-IPCountry", "US")
        .body(Body::from(r#"{"name":"page_view","path":"/random"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://dietcode.io"
    );
    assert_eq!(response.headers()["access-control-allow-methods"], "POST");

    let received = wait_for_requests(&server, 1).await;
    let line = body_text(&received[0]);
    let prefix = "page_view,bucket=metrics,environment=production,service=dietcode-io,path=/random visitor=\"";
    assert!(line.starts_with(prefix), "{}", line);

    let visitor = &line[prefix.len()..prefix.len() + 64];
    assert!(visitor.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(line[prefix.len() + 64..].starts_with(r#"",location="US" "#));
}

#[tokio::test]
async fn test_analytics_bad_data_has_no_cors_headers() {
    let (server, app) = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/a")
        .header("Origin", "https://dietcode.io")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("access-control-allow-origin").is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tail_items_are_isolated() {
    let (server, app) = setup().await;

    let response = app
        .oneshot(post_json(
            "/tail",
            json!([
                {
                    "scriptName": "blob-city",
                    "eventTimestamp": 1000,
                    "outcome": "ok",
                    "event": { "request": { "url": "https://blob.city/tunnel", "method": "GET" } },
                    "logs": [{ "level": "log", "message": [{ "tunnelId": "1234" }, "Forwarding"], "timestamp": 1001 }],
                    "exceptions": []
                },
                {
                    "eventTimestamp": 1000,
                    "outcome": "ok",
                    "event": { "cron": "* * * * *" },
                    "logs": [],
                    "exceptions": []
                },
                {
                    "scriptName": "raft",
                    "eventTimestamp": 1000,
                    "outcome": "ok",
                    "event": { "cron": "* * * * *" },
                    "logs": [],
                    "exceptions": []
                }
            ]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let received = wait_for_requests(&server, 2).await;
    // The empty cron invocation must not produce a third shipment
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let bodies: Vec<Value> = received
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    let by_service = |service: &str| {
        bodies
            .iter()
            .find(|b| b["streams"][0]["stream"]["service"] == service)
            .unwrap_or_else(|| panic!("No shipment for {}", service))
            .clone()
    };

    let ok = by_service("blob-city");
    assert_eq!(ok["streams"][0]["stream"]["level"], "info");
    assert_eq!(
        ok["streams"][0]["values"],
        json!([
            ["1000000000", r#"path="/tunnel" method="GET" msg="Incoming request""#],
            ["1001000000", r#"tunnelId="1234" msg="Forwarding""#]
        ])
    );

    let failure = by_service("ingest-worker");
    assert_eq!(failure["streams"][0]["stream"]["level"], "fatal");
    assert_eq!(failure["streams"][0]["stream"]["environment"], "production");
    let line = failure["streams"][0]["values"][0][1].as_str().unwrap();
    assert!(line.starts_with(r#"name="TranslationError" stack="TranslationError: Missing scriptName""#));
    assert!(line.ends_with(r#"msg="Missing scriptName""#));
}

#[tokio::test]
async fn test_tail_body_must_be_an_array() {
    let (_server, app) = setup().await;

    let response = app
        .oneshot(post_json("/tail", json!({ "scriptName": "blob-city" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_failure_does_not_affect_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/telegraf"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;

    let state = AppState::new(Arc::new(ArcSwap::from_pointee(create_test_config(&server.uri()))));
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let app = create_router(state, Arc::new(recorder.handle()));

    let response = app
        .oneshot(post_json(
            "/m",
            json!({ "name": "page_view", "service": "blob-city", "path": "/" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let received = wait_for_requests(&server, 1).await;
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_reloaded_config_is_used_for_new_requests() {
    let (server, _) = setup().await;
    let other = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&other)
        .await;

    let config = Arc::new(ArcSwap::from_pointee(create_test_config(&server.uri())));
    let state = AppState::new(config.clone());
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let app = create_router(state, Arc::new(recorder.handle()));

    config.store(Arc::new(create_test_config(&other.uri())));

    let response = app
        .oneshot(post_json(
            "/m",
            json!({ "name": "page_view", "service": "blob-city", "path": "/" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    wait_for_requests(&other, 1).await;
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_shipments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let state = AppState::new(Arc::new(ArcSwap::from_pointee(create_test_config(&server.uri()))));
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let gateway = tokio::spawn(serve(
        listener,
        state.clone(),
        Arc::new(recorder.handle()),
        async move {
            let _ = shutdown_rx.await;
        },
    ));

    {
        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/m", addr))
            .body(json!({ "name": "page_view", "service": "blob-city", "path": "/" }).to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    }

    // The backend has not answered yet
    shutdown_tx.send(()).unwrap();
    gateway.await.unwrap().unwrap();

    assert!(state.shipments.is_empty());
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(body_text(&received[0]).starts_with("page_view,bucket=metrics,"));
}
