use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use crate::api::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (white, black) = state.policy.stats().await;
    Json(json!({
        "status": "ok",
        "rules": { "white": white, "black": black },
    }))
}
