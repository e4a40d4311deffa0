// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public coupon listings (scraped from external sources).

use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lifecycle state of a coupon. The only transition is `Active -> Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    #[default]
    Active,
    Expired,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Active => "active",
            CouponStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(CouponStatus::Active),
            "expired" => Some(CouponStatus::Expired),
            _ => None,
        }
    }
}

/// Where a coupon can be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageChannel {
    Online,
    Store,
    Both,
}

impl UsageChannel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" | "app" | "website" => Some(UsageChannel::Online),
            "store" | "offline" | "in-store" => Some(UsageChannel::Store),
            "both" => Some(UsageChannel::Both),
            _ => None,
        }
    }
}

/// Stored coupon record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Document ID, see [`Coupon::doc_id`]
    pub id: String,
    pub brand_name: String,
    /// Lowercased brand for case-insensitive lookups
    pub brand_key: String,
    pub coupon_title: String,
    pub coupon_code: Option<String>,
    pub description: Option<String>,
    /// Expiry (RFC3339, `Z` suffix)
    pub expire_by: Option<String>,
    pub category_label: Option<String>,
    pub use_coupon_via: Option<UsageChannel>,
    pub coupon_visiting_link: Option<String>,
    #[serde(default)]
    pub status: CouponStatus,
    /// Feed URL the coupon was scraped from
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Coupon {
    /// Stable document ID so repeated scrapes of the same offer upsert
    /// instead of duplicating.
    pub fn doc_id(brand_name: &str, coupon_code: Option<&str>, coupon_title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(brand_name.trim().to_lowercase().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(coupon_code.unwrap_or("").trim().to_uppercase().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(coupon_title.trim().to_lowercase().as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }

    pub fn brand_key(brand_name: &str) -> String {
        brand_name.trim().to_lowercase()
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        is_past(self.expire_by.as_deref(), now)
    }

    /// Reconcile a scraped record with the stored one just before writing.
    /// Keeps `createdAt`, never revives an expired coupon, and marks the
    /// record expired if its expiry passed while it was in flight.
    pub fn reconcile(&mut self, existing: Option<&Coupon>, now: DateTime<Utc>) {
        if let Some(existing) = existing {
            self.created_at = existing.created_at.clone();
            if existing.status == CouponStatus::Expired {
                self.status = CouponStatus::Expired;
            }
        }
        if self.is_past_expiry(now) {
            self.status = CouponStatus::Expired;
        }
    }

    /// Whether the expiry sweep should flip this coupon.
    pub fn should_expire(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Active && self.is_past_expiry(now)
    }
}

/// Stored timestamps compare lexicographically; same predicate as the
/// Firestore `expireBy < now` filter.
pub(crate) fn is_past(expire_by: Option<&str>, now: DateTime<Utc>) -> bool {
    expire_by.is_some_and(|e| e < format_utc_rfc3339(now).as_str())
}
