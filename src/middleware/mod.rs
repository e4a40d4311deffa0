// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, error formatting, security headers).

pub mod auth;
pub mod errors;
pub mod security;

pub use auth::{require_auth, AuthUser};
pub use errors::format_errors;
