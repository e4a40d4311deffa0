// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device-side consumer of the API: an HTTP client and the local record of
//! partner apps the user has linked.

pub mod api;
pub mod synced_apps;

pub use api::{ApiClient, ClientError, CouponQuery, SignupInput};
pub use synced_apps::{StoreError, SyncedAppStore};
