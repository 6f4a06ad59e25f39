//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the axum router with proxy and management routes
//! - Wire up middleware (tracing, request ID)
//! - Select a backend per request and forward to it
//! - Relay the backend response, stream bodies both ways
//! - Observability (metrics, correlation IDs, trace context)

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::uri::{Authority, Scheme},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::grouper::Grouper;
use crate::observability::metrics;
use crate::observability::trace::TraceContext;
use crate::proxy::api;
use crate::router::Router as BackendRouter;

const MANAGEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Derives the routing key for a request. The default keys on the URI
/// path; embedders can group traffic differently.
pub type KeyFn = Arc<dyn Fn(&Request<Body>) -> String + Send + Sync>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub grouper: Arc<dyn Grouper>,
    pub router: Arc<dyn BackendRouter>,
    pub client: Client<HttpConnector, Body>,
    pub key_fn: KeyFn,
}

/// HTTP server for the proxy.
pub struct ProxyServer {
    app: Router,
}

impl ProxyServer {
    /// Create a server routing on the request path.
    pub fn new(grouper: Arc<dyn Grouper>, router: Arc<dyn BackendRouter>) -> Self {
        Self::with_key_fn(
            grouper,
            router,
            Arc::new(|request: &Request<Body>| request.uri().path().to_string()),
        )
    }

    /// Create a server with a caller-supplied routing key.
    pub fn with_key_fn(
        grouper: Arc<dyn Grouper>,
        router: Arc<dyn BackendRouter>,
        key_fn: KeyFn,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState {
            grouper,
            router,
            client,
            key_fn,
        };
        Self {
            app: build_router(state),
        }
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the axum router with all middleware layers.
pub(crate) fn build_router(state: AppState) -> Router {
    // Management answers locally and fast, so it gets a deadline. The
    // proxy path does not: a function call is allowed to run long.
    let management = Router::new()
        .route(
            "/1/lb/nodes",
            get(api::list_nodes)
                .put(api::add_node)
                .delete(api::remove_node),
        )
        .route("/1/lb/stats", get(api::throughput_stats))
        .layer(TimeoutLayer::new(MANAGEMENT_TIMEOUT));

    Router::new()
        .route("/{*path}", any(proxy_handler))
        .route("/", any(proxy_handler))
        .merge(management)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main proxy handler: pick a backend for the routing key, forward the
/// request with a rewritten authority, relay the response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method_str = request.method().to_string();
    let key = (state.key_fn)(&request);

    // Continue the caller's trace or start one.
    let trace = TraceContext::extract(request.headers()).unwrap_or_else(TraceContext::new_root);

    tracing::debug!(
        request_id = %request_id,
        method = %method_str,
        key = %key,
        "proxying request"
    );

    let selection = state
        .grouper
        .list(&key)
        .and_then(|nodes| state.router.route(&nodes, &key));
    let target = match selection {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(request_id = %request_id, key = %key, error = %e, "no routable backend");
            metrics::record_request(&method_str, 503, "none", start_time);
            // Read the body out so the client can finish sending and
            // reuse the connection.
            drain(request.into_body()).await;
            return (StatusCode::SERVICE_UNAVAILABLE, "no nodes available").into_response();
        }
    };

    let (mut parts, body) = request.into_parts();

    // Rewrite the authority; path and query pass through untouched.
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    if let Ok(authority) = Authority::from_str(&target) {
        uri_parts.authority = Some(authority);
    }
    parts.uri = Uri::from_parts(uri_parts).unwrap_or(parts.uri);

    trace.child().inject(&mut parts.headers);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(mut response) => {
            // Let the router learn from the response before it leaves.
            state
                .router
                .intercept_response(&target, &key, response.headers_mut());

            let status = response.status();
            metrics::record_request(&method_str, status.as_u16(), &target, start_time);
            tracing::debug!(
                request_id = %request_id,
                target = %target,
                status = %status,
                "relaying response"
            );

            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, target = %target, error = %e, "upstream error");
            metrics::record_request(&method_str, 502, &target, start_time);
            api::message(StatusCode::BAD_GATEWAY, format!("upstream request failed: {}", e))
        }
    }
}

// Consume whatever is left of the request body, stopping at the first
// read error.
async fn drain(mut body: Body) {
    while let Some(frame) = body.frame().await {
        if frame.is_err() {
            break;
        }
    }
}
