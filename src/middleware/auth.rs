// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token authentication middleware.
//!
//! Verifies the identity token, resolves the local user record and attaches
//! it to the request as [`AuthUser`].

use crate::error::{AppError, AuthError};
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

const MAX_RAW_UID_LEN: usize = 128;

/// Authenticated user attached to request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub user: User,
}

/// Middleware that requires a valid identity token for an active user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers().get(header::AUTHORIZATION))?.to_string();
    let uid = resolve_uid(&state, &token).await?;

    let user = check_account(state.db.get_user(&uid).await?)?;

    tracing::debug!(uid = %uid, "Request authenticated");
    request.extensions_mut().insert(AuthUser { uid, user });

    Ok(next.run(request).await)
}

/// Turn a bearer token into a UID, verifying it unless the development
/// bypass is active.
async fn resolve_uid(state: &AppState, token: &str) -> Result<String, AppError> {
    if let Some(verifier) = &state.token_verifier {
        return Ok(verifier.verify_id_token(token).await?.uid);
    }

    if state.config.dev_auth_bypass_enabled() {
        tracing::warn!("Development mode: skipping identity token verification");
        return Ok(dev_identity(token)?);
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "identity token verification is not configured"
    )))
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = auth_header
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredential)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedCredential);
    }

    Ok(token)
}

/// Reject missing and deactivated accounts.
pub fn check_account(user: Option<User>) -> Result<User, AuthError> {
    let user = user.ok_or(AuthError::UserNotFound)?;
    if !user.is_active {
        return Err(AuthError::UserDeactivated);
    }
    Ok(user)
}

#[derive(Deserialize)]
struct UnverifiedClaims {
    user_id: Option<String>,
    sub: Option<String>,
}

/// Development-only identity: the `user_id`/`sub` claim of an unsigned
/// (emulator) JWT, or else the raw token taken as the UID.
pub fn dev_identity(token: &str) -> Result<String, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() == 3 {
        let payload = URL_SAFE_NO_PAD
            .decode(parts[1].trim_end_matches('='))
            .map_err(|_| AuthError::MalformedCredential)?;
        let claims: UnverifiedClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedCredential)?;
        return claims
            .user_id
            .or(claims.sub)
            .filter(|uid| !uid.is_empty())
            .ok_or(AuthError::InvalidCredential);
    }

    if token.len() > MAX_RAW_UID_LEN || token.chars().any(char::is_whitespace) {
        return Err(AuthError::MalformedCredential);
    }
    Ok(token.to_string())
}
