use anyhow::Result;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use std::sync::Arc;
use std::net::SocketAddr;
use crate::acl::AccessPolicy;
use crate::config::Config;
use crate::metrics::GateMetrics;

pub mod router;
pub mod middleware;
pub mod handlers;

pub struct AppState {
    pub policy: Arc<AccessPolicy>,
    pub metrics: Arc<GateMetrics>,
    /// Bearer token required by the admin routes, if any.
    pub admin_token: Option<String>,
    /// Resolve the client from `X-Real-IP` / `X-Forwarded-For`.
    pub trust_forwarded: bool,
    /// Fallback directory served behind the gate.
    pub static_dir: Option<String>,
}

impl AppState {
    pub fn new(cfg: &Config, policy: Arc<AccessPolicy>, metrics: Arc<GateMetrics>) -> Self {
        Self {
            policy,
            metrics,
            admin_token: cfg.admin.token.clone(),
            trust_forwarded: cfg.acl.trust_forwarded_headers,
            static_dir: cfg.api.static_dir.clone(),
        }
    }
}

pub async fn serve(cfg: Config, policy: Arc<AccessPolicy>, metrics: Arc<GateMetrics>) -> Result<()> {
    let bind_addr = format!("{}:{}", cfg.api.bind, cfg.api.port);
    let state = Arc::new(AppState::new(&cfg, policy, metrics));
    let cors = build_cors_layer(&cfg.api.cors_allowed_origins);
    let app = build_app(state, cors);

    // ConnectInfo exposes the TCP peer address to the gate
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Access gate listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    ).await?;
    Ok(())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured; CORS will block all cross-origin requests");
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Full application: routes wrapped by the access gate, tracing and CORS.
pub fn build_app(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .merge(router::routes(state.clone(), state.static_dir.as_deref()))
        .layer(axum::middleware::from_fn_with_state(state, middleware::acl::gate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
