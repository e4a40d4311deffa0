// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error body formatting.
//!
//! Handlers and extractors render errors in the production shape. Outside
//! production this layer re-renders them with `status` and `stack` added.

use crate::response::ErrorDetail;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Add debugging fields to error bodies when not running in production.
pub async fn format_errors(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if state.config.is_production() {
        return response;
    }
    with_debug_fields(response)
}

fn with_debug_fields(mut response: Response) -> Response {
    let Some(detail) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    let status = response.status();
    let mut envelope = detail.envelope;
    envelope.status = Some(if status.is_server_error() { "error" } else { "fail" }.to_string());
    envelope.stack = Some(detail.stack);

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    let mut rebuilt = (parts.status, parts.headers, Json(envelope)).into_response();
    *rebuilt.extensions_mut() = parts.extensions;
    rebuilt
}
