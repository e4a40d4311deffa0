// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod coupon;
pub mod private_coupon;
pub mod synced_app;
pub mod user;

pub use coupon::{Coupon, CouponStatus, UsageChannel};
pub use private_coupon::{AddedMethod, CatalogCoupon, PrivateCoupon, RedeemError};
pub use synced_app::SyncedApp;
pub use user::User;
