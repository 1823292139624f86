//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing, concurrency limit, timeout)
//! - Bind server to listener
//! - Dispatch requests to forward, login or command handling
//! - Forward requests to the backend and relay responses

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, ConnectInfo, FromRequestParts, State},
    http::{HeaderName, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::Backend;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::login::LoginInterceptor;
use crate::http::request::{declared_host, request_id, rewrite_headers, upgrade_headers, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::relay;
use crate::http::websocket::{backend_request, Bridge, BridgeState};
use crate::identity::IdentityLookup;
use crate::observability::metrics;
use crate::routing::{RouteTarget, Router as RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable<RouteTarget>>,
    pub backend: Arc<Backend>,
    pub client: Client<HttpConnector, Body>,
    pub login: LoginInterceptor,
    pub connect_timeout: Duration,
}

/// HTTP gateway server.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server from configuration and an identity store.
    pub fn new(config: GatewayConfig, identities: Arc<dyn IdentityLookup>) -> GatewayResult<Self> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        let backend = Arc::new(Backend::new(&config.backend.address)?);
        let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let identity_header = HeaderName::from_str(&config.auth.identity_header)
            .map_err(|e| GatewayError::InvalidHeader(format!("{}: {}", config.auth.identity_header, e)))?;
        let login = LoginInterceptor::new(identities, identity_header, config.auth.max_payload_bytes);

        let state = AppState {
            routes,
            backend,
            client,
            login,
            connect_timeout,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until the shutdown signal fires.
    ///
    /// Failures of the listener itself surface as [`GatewayError::Listen`].
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> GatewayResult<()> {
        let addr = listener.local_addr().map_err(|source| GatewayError::Listen {
            address: self.config.listener.bind_address.clone(),
            source,
        })?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.address,
            base_path = %self.config.routes.base_path,
            "HTTP gateway starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP gateway received shutdown signal");
            })
            .await
            .map_err(|source| GatewayError::Listen {
                address: addr.to_string(),
                source,
            })?;

        tracing::info!("HTTP gateway stopped");
        Ok(())
    }
}

/// Route dispatcher: every request enters here.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    let target = match state.routes.at(&path) {
        Some(target) => *target,
        None => {
            tracing::warn!(request_id = %request_id(request.headers()), path = %path, "No route matched");
            metrics::record_request(request.method().as_str(), 404, "none", Instant::now());
            return (StatusCode::NOT_FOUND, "No matching route found").into_response();
        }
    };

    match target {
        RouteTarget::Command => upgrade_handler(state, peer, request).await,
        RouteTarget::Login if request.method() == Method::POST => forward(state, peer, request, true).await,
        RouteTarget::Login | RouteTarget::Forward => forward(state, peer, request, false).await,
    }
}

/// Rebuild the request for the backend, send it, relay the answer.
async fn forward(state: AppState, peer: SocketAddr, request: Request<Body>, intercept_login: bool) -> Response {
    let start_time = Instant::now();
    let route = if intercept_login { "login" } else { "forward" };
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, peer = %peer, "Forwarding request");

    let mut headers = rewrite_headers(&parts.headers, declared_host(&parts), peer);
    headers.remove(state.login.identity_header());

    let body = if intercept_login {
        match state.login.intercept(body, &mut headers).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(request_id = %request_id, path = %path, error = %e, "Login request rejected");
                metrics::record_request(method.as_str(), e.status_code().as_u16(), route, start_time);
                return e.into_response();
            }
        }
    } else {
        body
    };

    let uri = match state.backend.http_uri(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to rewrite request URI");
            metrics::record_request(method.as_str(), 500, route, start_time);
            return e.into_response();
        }
    };

    let mut outbound = Request::new(body);
    *outbound.method_mut() = method.clone();
    *outbound.uri_mut() = uri;
    *outbound.headers_mut() = headers;

    match state.client.request(outbound).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), route, start_time);
            relay_backend(&path, response)
        }
        Err(e) => {
            let error = GatewayError::dial(state.backend.address(), e);
            tracing::error!(request_id = %request_id, path = %path, error = %error, "Upstream error");
            metrics::record_request(method.as_str(), 502, route, start_time);
            error.into_response()
        }
    }
}

/// Stream the backend's hyper body back through the response relay.
fn relay_backend(path: &str, response: hyper::Response<Incoming>) -> Response {
    relay(path, response.map(Body::new))
}

/// Complete the caller's WebSocket handshake and bridge it to the backend.
async fn upgrade_handler(state: AppState, peer: SocketAddr, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let mut bridge = Bridge::new(peer);
    let (mut parts, _body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    bridge.transition(BridgeState::AwaitingClientUpgrade);
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            let _ = bridge.fail(GatewayError::UpgradeHandshake(rejection.body_text()));
            metrics::record_request(parts.method.as_str(), rejection.status().as_u16(), "command", start_time);
            return rejection.into_response();
        }
    };

    let mut headers = upgrade_headers(&parts.headers, peer);
    headers.remove(state.login.identity_header());
    let backend_request = match state
        .backend
        .ws_uri(&parts.uri)
        .and_then(|target| backend_request(&target, headers))
    {
        Ok(request) => request,
        Err(e) => {
            let e = bridge.fail(e);
            metrics::record_request(parts.method.as_str(), 502, "command", start_time);
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    metrics::record_request(parts.method.as_str(), 101, "command", start_time);
    let dial_timeout = state.connect_timeout;
    upgrade
        .on_failed_upgrade(move |e| {
            tracing::warn!(request_id = %request_id, peer = %peer, error = %e, "Client upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            if let Err(e) = bridge.run(socket, backend_request, dial_timeout).await {
                tracing::debug!(peer = %peer, error = %e, "Bridge ended with error");
            }
        })
}
