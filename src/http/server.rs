//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with probe, metrics and echo handlers
//! - Wire up middleware (tracing, limits, request ID, timeout, metrics)
//! - Serve the router on the plain listener and, with TLS, on the secure one
//! - Turn each request into a snapshot and render it

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Extension, Json, Router,
};
use axum_server::Handle;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::EchoConfig;
use crate::health::{probe_routes, Readiness};
use crate::http::middleware::record_metrics;
use crate::inspect::cookies::{parse_set_cookie, SET_COOKIE_REQUEST_HEADER};
use crate::inspect::headers::response_status;
use crate::inspect::{Inspector, RequestParts, Transport};
use crate::net::tls::Certificate;
use crate::platform::ServerFacts;

pub const METRICS_PATH: &str = "/metrics";

/// Grace period for in-flight TLS connections on shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into the echo handler.
#[derive(Clone)]
pub struct AppState {
    pub inspector: Arc<Inspector>,
    /// Transport ceiling for buffered bodies.
    pub body_limit: usize,
}

/// HTTP server for the echo service.
pub struct HttpServer {
    router: Router,
    config: EchoConfig,
    certificate: Option<Certificate>,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// `certificate` must be present when TLS is enabled; `metrics` enables
    /// the scrape endpoint.
    pub fn new(
        config: EchoConfig,
        facts: ServerFacts,
        certificate: Option<Certificate>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let descriptor = certificate.as_ref().map(|c| Arc::new(c.descriptor().clone()));
        let inspector = Arc::new(Inspector::new(&config.inspect, Arc::new(facts), descriptor));

        let router = Self::build_router(&config, inspector, metrics);
        Self {
            router,
            config,
            certificate,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EchoConfig, inspector: Arc<Inspector>, metrics: Option<PrometheusHandle>) -> Router {
        let body_limit = inspector.decoder().max_body_size().saturating_mul(2);
        let state = AppState { inspector, body_limit };

        let echo = Router::new()
            .route("/{*path}", any(echo_handler))
            .route("/", any(echo_handler))
            .with_state(state)
            .layer(middleware::from_fn(record_metrics))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(TraceLayer::new_for_http().make_span_with(request_span));

        let mut internal = probe_routes(Readiness::from_config(&config.health));
        if let Some(handle) = metrics {
            internal = internal.route(METRICS_PATH, get(render_metrics).with_state(handle));
        }
        if config.observability.log_healthchecks {
            internal = internal.layer(TraceLayer::new_for_http().make_span_with(request_span));
        }

        echo.merge(internal)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Serves `listener` as plain HTTP and, when a certificate was provided,
    /// binds the TLS listener from config.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let handle = Handle::new();
        let tls_handle = handle.clone();
        let signal = async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            tls_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        };

        let plain_app = self
            .router
            .clone()
            .layer(Extension(Transport::Plain))
            .into_make_service_with_connect_info::<SocketAddr>();
        let plain = axum::serve(listener, plain_app)
            .with_graceful_shutdown(signal)
            .into_future();

        match &self.certificate {
            Some(certificate) => {
                let tls_addr: SocketAddr = self
                    .config
                    .listener
                    .tls
                    .bind_address
                    .parse()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                tracing::info!(address = %tls_addr, "HTTPS server starting");

                let secure_app = self
                    .router
                    .clone()
                    .layer(Extension(Transport::Secure))
                    .into_make_service_with_connect_info::<SocketAddr>();
                let secure = axum_server::bind_rustls(tls_addr, certificate.rustls_config())
                    .handle(handle)
                    .serve(secure_app);

                tokio::try_join!(plain, secure)?;
            }
            None => plain.await?,
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EchoConfig {
        &self.config
    }
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Echo handler for every method and path.
async fn echo_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let status = response_status(&parts.headers);

    if parts.method == Method::HEAD {
        return (status, [(header::CONTENT_TYPE, "application/json")]).into_response();
    }

    let body = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, limit = state.body_limit, "Failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let transport = parts.extensions.get::<Transport>().copied().unwrap_or_default();

    let snapshot = state.inspector.snapshot(RequestParts {
        method: &parts.method,
        path: parts.uri.path(),
        query: parts.uri.query().unwrap_or_default(),
        headers: &parts.headers,
        body: &body,
        peer,
        transport,
        response_encoding: None,
    });

    tracing::debug!(
        method = %parts.method,
        path = %parts.uri.path(),
        tokens = snapshot.tokens.len(),
        "Echoing request"
    );

    let mut response = (status, Json(snapshot)).into_response();
    if let Some(cookie) = outbound_cookie(&parts.headers) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// `Set-Cookie` value requested through the cookie request header.
fn outbound_cookie(headers: &HeaderMap) -> Option<HeaderValue> {
    let requested = headers.get(SET_COOKIE_REQUEST_HEADER)?.to_str().ok()?;
    let cookie = parse_set_cookie(requested)?;
    match HeaderValue::from_str(&cookie.to_set_cookie()) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "Requested cookie is not a valid header value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::STATUS_OVERRIDE_HEADER;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router(config: &EchoConfig) -> Router {
        let inspector = Arc::new(Inspector::new(&config.inspect, Arc::new(ServerFacts::default()), None));
        HttpServer::build_router(config, inspector, None)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_echo_post_form() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/submit?x=1")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("a=1&b=two"))
            .unwrap();

        let response = router(&EchoConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = json_body(response).await;
        assert_eq!(body["request"]["method"], "POST");
        assert_eq!(body["request"]["path"], "/submit");
        assert_eq!(body["request"]["query"], "x=1");
        assert_eq!(body["request"]["body"]["content"]["b"], "two");
    }

    #[tokio::test]
    async fn test_status_override_and_cookie() {
        let request = Request::builder()
            .uri("/")
            .header(STATUS_OVERRIDE_HEADER, "418")
            .header(SET_COOKIE_REQUEST_HEADER, "session=abc; Path=/; HttpOnly")
            .body(Body::empty())
            .unwrap();

        let response = router(&EchoConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status().as_u16(), 418);

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("session=abc"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let request = Request::builder()
            .method(Method::HEAD)
            .uri("/anything")
            .header(STATUS_OVERRIDE_HEADER, "404")
            .body(Body::empty())
            .unwrap();

        let response = router(&EchoConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = EchoConfig::default();
        config.inspect.max_body_size = 8;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(vec![b'a'; 64]))
            .unwrap();

        let response = router(&config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_truncated_within_ceiling() {
        let mut config = EchoConfig::default();
        config.inspect.max_body_size = 8;

        let request = Request::builder()
            .method(Method::PUT)
            .uri("/")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("0123456789abc"))
            .unwrap();

        let response = router(&config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["request"]["body"]["content"], "01234567");
        assert_eq!(body["request"]["body"]["truncated"], true);
    }

    #[tokio::test]
    async fn test_probes_bypass_echo() {
        let request = Request::builder().uri("/healthz/live").body(Body::empty()).unwrap();
        let response = router(&EchoConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_metrics_route_absent_without_handle() {
        let request = Request::builder().uri(METRICS_PATH).body(Body::empty()).unwrap();
        let response = router(&EchoConfig::default()).oneshot(request).await.unwrap();
        // Falls through to the echo handler.
        let body = json_body(response).await;
        assert_eq!(body["request"]["path"], METRICS_PATH);
    }
}
