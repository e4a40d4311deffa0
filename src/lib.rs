// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Dealora: coupon aggregation backend
//!
//! This crate provides the REST API for browsing scraped public coupons and
//! managing per-user private coupons, the background jobs that keep coupon
//! data fresh, and a small client for device-side consumers.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use config::Config;
use db::FirestoreDb;
use services::FirebaseTokenVerifier;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    /// `None` when no identity project is configured (development bypass).
    pub token_verifier: Option<Arc<FirebaseTokenVerifier>>,
}
