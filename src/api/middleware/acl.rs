use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::client_ip::{self, ClientIp};
use crate::acl::Decision;
use crate::api::AppState;
use crate::error::AppError;

/// Request gate: resolves the client address, asks the access policy and
/// rejects denied clients with 403 before any handler runs.
///
/// The resolved [`ClientIp`] is stored in the request extensions for
/// downstream handlers.
pub async fn gate(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let client = match client_ip::resolve(req.headers(), peer, state.trust_forwarded) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Rejecting request with unusable client address: {}", e);
            return AppError::from(e).into_response();
        }
    };

    let decision = match client.as_u32() {
        Some(addr) => state.policy.check(addr).await,
        None => Decision::Unspecified,
    };
    state.metrics.record(&decision);

    if let Decision::Deny(rule) = decision {
        tracing::warn!("Denied {} {} from {} by black list rule {}", req.method(), req.uri().path(), client, rule);
        return (
            StatusCode::FORBIDDEN,
            format!("black list deny your ip {}", client),
        )
            .into_response();
    }

    if let Decision::Allow(rule) = decision {
        tracing::debug!("Allowed {} by white list rule {}", client, rule);
    }

    req.extensions_mut().insert::<ClientIp>(client);
    next.run(req).await
}
