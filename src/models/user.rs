// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    /// Identity-provider UID (also used as document ID)
    pub uid: String,
    pub name: String,
    /// Lowercased, unique across users
    pub email: String,
    pub phone: String,
    /// Deactivated users cannot authenticate
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(uid: String, name: String, email: String, phone: String, now: &str) -> Self {
        Self {
            uid,
            name,
            email,
            phone,
            is_active: true,
            profile_picture: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            last_login: None,
        }
    }
}
