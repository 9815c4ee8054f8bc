use axum::{routing::{get, put}, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use super::AppState;
use super::handlers;

pub fn routes(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let router = Router::new()
        // Health (public)
        .route("/health", get(handlers::health::health_check))
        // Prometheus metrics (public)
        .route("/metrics", get(handlers::metrics::prometheus_metrics))
        // Black/white list admin (admin token when configured)
        .route("/black/data", get(handlers::black::data))
        .route(
            "/black/{list}/{ip}",
            put(handlers::black::put_ip).delete(handlers::black::delete_ip),
        )
        .with_state(state);

    // Static content behind the gate (must come after with_state)
    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}
