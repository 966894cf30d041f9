use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config,
    handlers::{self, AppState},
    metrics, origin,
    signals::setup_signal_handlers,
};

/// Inbound bodies above this size are rejected
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Slack on top of the backend timeout when draining shipments at shutdown
const SHIPMENT_DRAIN_MARGIN: Duration = Duration::from_secs(1);

/// Start the ingestion gateway
///
/// This function:
/// 1. Initializes metrics
/// 2. Sets up signal handlers for graceful shutdown and config reload
/// 3. Creates the Axum application
/// 4. Binds to the configured address
/// 5. Serves requests with graceful shutdown support
/// 6. Waits for in-flight shipments before returning
pub async fn start_server(config: Config, config_path: PathBuf) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    // Wrap config in ArcSwap for atomic reload support
    let config_swap = Arc::new(ArcSwap::from_pointee(config.clone()));

    let (shutdown_tx, signal_handle) = setup_signal_handlers(config_swap.clone(), config_path)?;
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app_state = AppState::new(config_swap.clone());

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting ingest gateway on {}", addr);
    info!(
        "Configuration: {} analytics origins, telegraf {}, loki {}",
        config.analytics.origins.len(),
        config.backends.telegraf_url,
        config.backends.loki_url
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    serve(listener, app_state, metrics_handle, async move {
        let _ = shutdown_rx.recv().await;
        info!("Shutdown signal received, draining connections...");
    })
    .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Serve on `listener` until `shutdown` resolves, then wait for in-flight
/// shipments. Requests already answered with 202 get up to one backend
/// timeout (plus a second) to reach their backend.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app_state: AppState,
    metrics_handle: Arc<PrometheusHandle>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(app_state.clone(), metrics_handle);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let drain_timeout = app_state.config.load().backends.timeout() + SHIPMENT_DRAIN_MARGIN;
    if app_state.drain_shipments(drain_timeout).await {
        info!("All shipments finished");
    }

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(app_state: AppState, metrics_handle: Arc<PrometheusHandle>) -> Router {
    // Browser-facing routes, gated on the origin allow-list
    let browser_routes = Router::new()
        .route(
            "/a",
            post(handlers::analytics::handle_analytics)
                .options(handlers::analytics::preflight)
                .fallback(handlers::bad_method),
        )
        .layer(middleware::from_fn_with_state(
            app_state.config.clone(),
            origin::origin_middleware,
        ))
        .with_state(app_state.clone());

    // Server-side routes, secured by Access in front of the gateway
    let ingest_routes = Router::new()
        .route("/p", any(handlers::ping::ping))
        .route(
            "/m",
            post(handlers::metric::handle_metric).fallback(handlers::bad_method),
        )
        .route(
            "/l",
            post(handlers::logs::handle_logs).fallback(handlers::bad_method),
        )
        .route(
            "/t",
            post(handlers::traces::handle_traces).fallback(handlers::bad_method),
        )
        .route(
            "/tail",
            post(handlers::tail::handle_tail).fallback(handlers::bad_method),
        )
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(app_state);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(metrics_handle)
        .merge(browser_routes)
        .merge(ingest_routes)
        .fallback(handlers::bad_route)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyticsConfig, BackendsConfig, ServerConfig, TailConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn create_test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8787,
                log_level: "info".to_string(),
                log_format: "text".to_string(),
            },
            analytics: AnalyticsConfig {
                origins: vec!["https://dietcode.io".to_string()],
            },
            backends: BackendsConfig {
                // Nothing listens here; shipments fail in the background
                telegraf_url: "http://127.0.0.1:9/put".to_string(),
                loki_url: "http://127.0.0.1:9/put".to_string(),
                client_id: String::new(),
                client_secret: String::new(),
                timeout_seconds: 1,
            },
            tail: TailConfig::default(),
        }
    }

    fn create_app() -> Router {
        let state = AppState::new(Arc::new(ArcSwap::from_pointee(create_test_config())));
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        create_router(state, Arc::new(recorder.handle()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = create_app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ping_answers_any_method() {
        for method in ["GET", "POST", "PUT"] {
            let request = Request::builder().method(method).uri("/p").body(Body::empty()).unwrap();
            let (status, body) = send(request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "pong");
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = send(post("/nope", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad route");
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let request = Request::builder().method("GET").uri("/m").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad method");
    }

    #[tokio::test]
    async fn test_traces_are_unimplemented() {
        let (status, body) = send(post("/t", "{}")).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body, "Unimplemented");
    }

    #[tokio::test]
    async fn test_empty_and_malformed_bodies_are_bad_data() {
        for path in ["/m", "/l", "/tail"] {
            for body in ["", "{}", "not json"] {
                let (status, text) = send(post(path, body)).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{} {:?}", path, body);
                assert_eq!(text, "Bad data");
            }
        }
    }

    #[tokio::test]
    async fn test_analytics_requires_origin() {
        let (status, body) = send(post("/a", r#"{"name":"page_view","path":"/"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad origin");
    }

    #[tokio::test]
    async fn test_analytics_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/a")
            .header("Origin", "https://dietcode.io")
            .body(Body::empty())
            .unwrap();
        let response = create_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://dietcode.io"
        );
        assert_eq!(response.headers()["access-control-allow-methods"], "POST");
    }

    #[tokio::test]
    async fn test_accepted_metric() {
        let (status, body) = send(post(
            "/m",
            r#"{"name":"request","service":"blob-city","method":"GET","path":"/","status":200}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_empty());
    }
}
