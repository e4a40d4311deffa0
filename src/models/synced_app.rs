// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner app a device has linked for coupon discovery.

use serde::{Deserialize, Serialize};

/// Device-side record of a synced app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedApp {
    pub app_id: String,
    pub app_name: String,
    /// Unix milliseconds
    pub synced_at: i64,
}

impl SyncedApp {
    pub fn new(app_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_name: app_name.into(),
            synced_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
