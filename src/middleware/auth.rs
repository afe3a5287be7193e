// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::{
    config::AppState,
    models::auth::{Claims, CurrentUser, RequestContext},
};

/// Resolves the caller identity for the request. Authentication is not
/// enforced here: a missing or invalid bearer token degrades to the
/// Anonymous sentinel so that the audit trail always has an actor.
pub async fn identity_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = bearer_token(request.headers())
        .and_then(|token| decode_user(token, &app_state.jwt_secret))
        .unwrap_or_else(CurrentUser::anonymous);

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn decode_user(token: &str, secret: &str) -> Option<CurrentUser> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => Some(CurrentUser::from(data.claims)),
        Err(e) => {
            tracing::debug!("ignoring invalid bearer token: {}", e);
            None
        }
    }
}

/// Source address for the audit trail: the first comma-separated value of
/// X-Forwarded-For if present, else the direct connection address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extractor handing handlers the actor identity and source address as one
/// value, so services receive them explicitly instead of reading ambient
/// state.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_else(CurrentUser::anonymous);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(RequestContext {
            user,
            ip_address: client_ip(&parts.headers, peer),
        })
    }
}
