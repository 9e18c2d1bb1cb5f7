//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Guard `/qr` with the API key gate and the rate limiter, in that order
//! - Wire up cross-cutting layers (request ID, tracing, metrics, headers)
//! - Serve until the shutdown signal, then drain
//! - Run the rate limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::error::{AppError, Failure};
use crate::http::request::{make_request_span, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::{health, qr};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::render::{PngRenderer, QrRenderer};
use crate::security::api_key::api_key_middleware;
use crate::security::headers::nosniff_layer;
use crate::security::rate_limit::{rate_limit_middleware, run_sweeper, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub limiter: Arc<RateLimiter>,
    pub renderer: Arc<dyn QrRenderer>,
    pub started_at: Instant,
}

/// HTTP server for the QR code service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server rendering PNGs with the configured options.
    pub fn new(config: ServiceConfig) -> Self {
        let renderer = Arc::new(PngRenderer::new(&config.render));
        Self::with_renderer(config, renderer)
    }

    /// Create a server with a specific renderer.
    pub fn with_renderer(config: ServiceConfig, renderer: Arc<dyn QrRenderer>) -> Self {
        let state = AppState {
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            config: Arc::new(config),
            renderer,
            started_at: Instant::now(),
        };
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    fn build_router(state: AppState) -> Router {
        let qr_routes = get(qr::get_qr)
            .post(qr::post_qr)
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                api_key_middleware,
            ))
            .fallback(not_found);

        Router::new()
            .route("/", get(health::usage).fallback(not_found))
            .route("/health", get(health::health).fallback(not_found))
            .route("/qr", qr_routes)
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(nosniff_layer())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            auth_enabled = self.state.config.auth_enabled(),
            rate_limit_max = self.state.config.rate_limit.max_requests,
            rate_limit_window_ms = self.state.config.rate_limit.window_ms,
            max_text_length = self.state.config.max_text_length,
            "HTTP server starting"
        );

        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&self.state.limiter),
            shutdown.subscribe(),
        ));

        let mut stop = shutdown.subscribe();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        // The server can also end on its own; make sure the sweeper follows.
        shutdown.trigger();
        let _ = sweeper.await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn not_found() -> Failure {
    AppError::not_found().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct FailingRenderer(&'static str);

    impl QrRenderer for FailingRenderer {
        fn render(&self, _text: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Encode(self.0.to_string()))
        }
    }

    struct SlowRenderer(Duration);

    impl QrRenderer for SlowRenderer {
        fn render(&self, _text: &str) -> Result<Vec<u8>, RenderError> {
            std::thread::sleep(self.0);
            Ok(vec![1, 2, 3])
        }
    }

    fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let peer: SocketAddr = "192.0.2.10:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    fn json_post(body: &str) -> Request<Body> {
        let mut request = request(Method::POST, "/qr", Body::from(body.to_string()));
        request.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );
        request
    }

    async fn send(server: &HttpServer, request: Request<Body>) -> Response {
        server.router().oneshot(request).await.unwrap()
    }

    async fn error_code(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["code"].clone()
    }

    #[tokio::test]
    async fn test_health_is_unguarded() {
        let config = ServiceConfig {
            api_key: Some("secret".into()),
            ..Default::default()
        };
        let server = HttpServer::new(config);
        let response = send(&server, request(Method::GET, "/health", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("ratelimit-limit").is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "qr-code-api");
        assert!(body["uptimeSeconds"].is_u64());
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_usage_root() {
        let server = HttpServer::new(ServiceConfig::default());
        let response = send(&server, request(Method::GET, "/", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_qr_returns_png() {
        let server = HttpServer::new(ServiceConfig::default());
        let response = send(
            &server,
            request(Method::GET, "/qr?text=https%3A%2F%2Fexample.com", Body::empty()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=86400"
        );
        assert_eq!(response.headers()["ratelimit-remaining"], "99");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_missing_vs_invalid_text() {
        let server = HttpServer::new(ServiceConfig::default());

        let response = send(&server, request(Method::GET, "/qr", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, json!("MISSING_TEXT"));

        let response = send(&server, request(Method::GET, "/qr?text=%20%20", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, json!("VALIDATION_ERROR"));

        let response = send(&server, json_post("{}")).await;
        assert_eq!(error_code(response).await, json!("MISSING_TEXT"));

        let response = send(&server, json_post(r#"{"text": ""}"#)).await;
        assert_eq!(error_code(response).await, json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_text_over_configured_length() {
        let config = ServiceConfig {
            max_text_length: 5,
            ..Default::default()
        };
        let server = HttpServer::new(config);
        let response = send(&server, json_post(r#"{"text": "123456"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_malformed_and_oversized_bodies() {
        let server = HttpServer::new(ServiceConfig::default());

        let response = send(&server, json_post("{\"text\": ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, json!("PARSE_ERROR"));

        let huge = format!(r#"{{"text": "{}"}}"#, "a".repeat(11 * 1024));
        let response = send(&server, json_post(&huge)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, json!("PARSE_ERROR"));
    }

    #[tokio::test]
    async fn test_non_json_body_has_no_text() {
        let server = HttpServer::new(ServiceConfig::default());
        let mut request = request(Method::POST, "/qr", Body::from("text=hello"));
        request.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        let response = send(&server, request).await;
        assert_eq!(error_code(response).await, json!("MISSING_TEXT"));
    }

    #[tokio::test]
    async fn test_auth_runs_before_rate_limit() {
        let config = ServiceConfig {
            api_key: Some("secret".into()),
            ..Default::default()
        };
        let server = HttpServer::new(config);

        let response = send(&server, request(Method::GET, "/qr?text=hi", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("ratelimit-limit").is_none());
        assert_eq!(error_code(response).await, json!("UNAUTHORIZED"));

        let mut with_header = request(Method::GET, "/qr?text=hi", Body::empty());
        with_header
            .headers_mut()
            .insert("x-api-key", "secret".parse().unwrap());
        let response = send(&server, with_header).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_throttled_response_carries_headers() {
        let mut config = ServiceConfig::default();
        config.rate_limit.max_requests = 1;
        let server = HttpServer::new(config);

        let first = send(&server, request(Method::GET, "/qr?text=a", Body::empty())).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = send(&server, request(Method::GET, "/qr?text=a", Body::empty())).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["ratelimit-remaining"], "0");
        assert_eq!(second.headers()["ratelimit-policy"], "1;w=900");
        assert_eq!(error_code(second).await, json!("RATE_LIMIT_EXCEEDED"));
    }

    #[tokio::test]
    async fn test_renderer_failures_are_normalized() {
        let server = HttpServer::with_renderer(
            ServiceConfig::default(),
            Arc::new(FailingRenderer("buffer overflow")),
        );
        let response = send(&server, request(Method::GET, "/qr?text=a", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, json!("INVALID_TEXT"));

        let server = HttpServer::with_renderer(
            ServiceConfig::default(),
            Arc::new(FailingRenderer("bad mask pattern")),
        );
        let response = send(&server, request(Method::GET, "/qr?text=a", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_code(response).await, json!("INTERNAL_ERROR"));
    }

    #[tokio::test]
    async fn test_render_deadline() {
        let mut config = ServiceConfig::default();
        config.render.timeout_ms = 20;
        let server = HttpServer::with_renderer(
            config,
            Arc::new(SlowRenderer(Duration::from_millis(300))),
        );
        let response = send(&server, request(Method::GET, "/qr?text=a", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_code(response).await, json!("NETWORK_ERROR"));
    }

    #[tokio::test]
    async fn test_unknown_routes_and_methods() {
        let server = HttpServer::new(ServiceConfig::default());

        let response = send(&server, request(Method::GET, "/nope", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_code(response).await, json!("NOT_FOUND"));

        let response = send(&server, request(Method::DELETE, "/qr", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_code(response).await, json!("NOT_FOUND"));

        let response = send(&server, request(Method::POST, "/health", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
