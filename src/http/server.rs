//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Dispatch requests to the route table
//! - Forward requests to backends and rewrite redirects on the way back
//! - Splice upgraded connections
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::redirect::{RedirectContext, RedirectRewriter};
use crate::http::{request, response, websocket};
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub rewriter: RedirectRewriter,
    pub client: Client<HttpConnector, Body>,
}

/// Path-mounting gateway in front of the stack's web services.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a gateway serving the given route table.
    pub fn new(config: GatewayConfig, routes: RouteTable) -> Self {
        let routes = Arc::new(routes);
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            rewriter: RedirectRewriter::new(routes.clone()),
            routes,
            client,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(request::propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(request::set_request_id_layer())
    }

    /// Run the server until a shutdown message arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "Gateway starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Catch-all handler: match route, forward, rewrite redirect.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request::request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();
    let method = request.method().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let rule = match state.routes.match_request(&request) {
        Some(rule) => rule.clone(),
        None => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request(&method, 404, "none", start_time);
            return (StatusCode::NOT_FOUND, "No matching route found").into_response();
        }
    };

    let is_upgrade = websocket::is_upgrade_request(request.headers());
    let client_upgrade = if is_upgrade {
        Some(hyper::upgrade::on(&mut request))
    } else {
        None
    };

    let (parts, body) = request.into_parts();
    let upstream = match request::build_upstream_request(parts, body, &rule, Some(addr), is_upgrade)
    {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %rule.name, error = %e, "Invalid upstream request");
            metrics::record_request(&method, 500, &rule.name, start_time);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream request").into_response();
        }
    };

    let mut upstream_response = match state.client.request(upstream).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                route = %rule.name,
                backend = %rule.backend,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&method, 502, &rule.name, start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    if upstream_response.status() == StatusCode::SWITCHING_PROTOCOLS {
        if let Some(client_upgrade) = client_upgrade {
            let backend_upgrade = hyper::upgrade::on(&mut upstream_response);
            websocket::spawn_tunnel(client_upgrade, backend_upgrade, rule.name.clone());
        }
    }

    let ctx = RedirectContext {
        request_path: &path,
        is_upgrade,
    };
    let (response, outcome) =
        response::prepare_response(upstream_response.map(Body::new), &state.rewriter, &ctx);

    let status = response.status();
    if status.is_redirection() {
        metrics::record_redirect(&rule.name, &outcome);
    }
    metrics::record_request(&method, status.as_u16(), &rule.name, start_time);

    tracing::debug!(
        request_id = %request_id,
        route = %rule.name,
        status = status.as_u16(),
        redirect = outcome.label(),
        "Request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use axum::extract::connect_info::MockConnectInfo;
    use tower::ServiceExt;

    fn gateway(routes: &[(&str, &str, &str)]) -> Router {
        let routes: Vec<RouteConfig> = routes
            .iter()
            .map(|(name, prefix, backend)| RouteConfig {
                name: name.to_string(),
                prefix: prefix.to_string(),
                backend: backend.to_string(),
            })
            .collect();
        let table = RouteTable::from_config(&routes).unwrap();
        let config = GatewayConfig {
            routes,
            ..GatewayConfig::default()
        };
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        GatewayServer::new(config, table)
            .router
            .layer(MockConnectInfo(addr))
    }

    #[tokio::test]
    async fn test_unmatched_path_is_404_with_request_id() {
        let app = gateway(&[("litellm", "/litellm", "litellm:4000")]);

        let response = app
            .oneshot(Request::builder().uri("/other").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(request::X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_502() {
        let app = gateway(&[("dead", "/", "127.0.0.1:1")]);

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_incoming_request_id_preserved() {
        let app = gateway(&[("litellm", "/litellm", "litellm:4000")]);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nowhere")
                    .header(request::X_REQUEST_ID, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[request::X_REQUEST_ID], "req-42");
    }
}
