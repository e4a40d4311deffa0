// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expiry sweep: flip past-due coupons to `expired`, then prune old ones.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub coupons_expired: usize,
    pub private_coupons_expired: usize,
    pub coupons_deleted: usize,
}

/// Expired public coupons whose expiry is before this instant are deleted.
/// `None` when retention is disabled (0 days).
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> Option<DateTime<Utc>> {
    (retention_days > 0).then(|| now - Duration::days(i64::from(retention_days)))
}

pub async fn run_cleanup(
    db: &FirestoreDb,
    now: DateTime<Utc>,
    retention_days: u32,
) -> Result<CleanupReport, AppError> {
    let stamp = format_utc_rfc3339(now);

    let coupons_expired = db.expire_coupons(&stamp).await?;
    let private_coupons_expired = db.expire_private_coupons(&stamp).await?;

    let coupons_deleted = match retention_cutoff(now, retention_days) {
        Some(cutoff) => {
            db.delete_expired_coupons(&format_utc_rfc3339(cutoff))
                .await?
        }
        None => 0,
    };

    let report = CleanupReport {
        coupons_expired,
        private_coupons_expired,
        coupons_deleted,
    };
    tracing::info!(
        coupons_expired,
        private_coupons_expired,
        coupons_deleted,
        "Expired coupon cleanup finished"
    );
    Ok(report)
}
