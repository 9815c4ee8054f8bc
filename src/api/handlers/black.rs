use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use crate::acl::{Ipv4Prefix, ListKind, PolicySnapshot};
use crate::api::AppState;
use crate::api::middleware::auth::AdminUser;
use crate::api::middleware::client_ip::ClientIp;
use crate::error::AppResult;

#[derive(Deserialize)]
pub struct MaskQuery {
    #[serde(default)]
    mask: Option<String>,
}

impl MaskQuery {
    /// `ip` plus the `mask` parameter (default 32) as CIDR text.
    fn cidr(&self, ip: &str) -> String {
        format!("{}/{}", ip, self.mask.as_deref().unwrap_or("32"))
    }
}

pub async fn data(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Json<PolicySnapshot> {
    Json(state.policy.snapshot().await)
}

pub async fn put_ip(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Extension(client): Extension<ClientIp>,
    Path((list, ip)): Path<(ListKind, String)>,
    Query(query): Query<MaskQuery>,
) -> AppResult<Json<Value>> {
    let rule: Ipv4Prefix = query.cidr(&ip).parse()?;
    tracing::info!("{} insert {} ip: {}", client, list, rule);

    let changed = state.policy.insert(list, rule).await;
    Ok(Json(json!({
        "success": true,
        "list": list,
        "rule": rule.to_string(),
        "changed": changed,
    })))
}

pub async fn delete_ip(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Extension(client): Extension<ClientIp>,
    Path((list, ip)): Path<(ListKind, String)>,
    Query(query): Query<MaskQuery>,
) -> AppResult<Json<Value>> {
    let rule: Ipv4Prefix = query.cidr(&ip).parse()?;
    tracing::info!("{} delete {} ip: {}", client, list, rule);

    let changed = state.policy.delete(list, rule).await;
    Ok(Json(json!({
        "success": true,
        "list": list,
        "rule": rule.to_string(),
        "changed": changed,
    })))
}
