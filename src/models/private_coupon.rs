// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user coupons with redemption state.

use super::coupon::{is_past, CouponStatus, UsageChannel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a private coupon entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddedMethod {
    /// Typed in by the user
    Manual,
    /// Discovered through a synced partner app
    Sync,
    /// Loaded by an operator
    Seed,
}

impl AddedMethod {
    /// Methods whose records form the shared catalog returned by sync.
    pub const CATALOG: [AddedMethod; 2] = [AddedMethod::Seed, AddedMethod::Sync];

    pub fn as_str(self) -> &'static str {
        match self {
            AddedMethod::Manual => "manual",
            AddedMethod::Sync => "sync",
            AddedMethod::Seed => "seed",
        }
    }

    /// Manual coupons belong to one user and are never shared.
    pub fn is_catalog(self) -> bool {
        Self::CATALOG.contains(&self)
    }
}

/// Stored private coupon in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateCoupon {
    /// Document ID
    pub id: String,
    /// Owner UID
    pub user_id: String,
    pub brand_name: String,
    /// Lowercased brand for case-insensitive lookups
    pub brand_key: String,
    pub coupon_name: Option<String>,
    pub coupon_title: String,
    pub description: Option<String>,
    pub expire_by: Option<String>,
    pub category_label: Option<String>,
    pub use_coupon_via: Option<UsageChannel>,
    pub discount_type: Option<String>,
    pub discount_value: Option<f64>,
    pub minimum_order: Option<f64>,
    pub coupon_code: Option<String>,
    pub coupon_visiting_link: Option<String>,
    pub terms: Option<String>,
    #[serde(default)]
    pub status: CouponStatus,
    pub added_method: AddedMethod,
    #[serde(default)]
    pub redeemed: bool,
    pub redeemed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PrivateCoupon {
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.user_id == uid
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        is_past(self.expire_by.as_deref(), now)
    }

    pub fn should_expire(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Active && self.is_past_expiry(now)
    }

    /// Mark as redeemed. Fails if already redeemed or past expiry.
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<(), RedeemError> {
        if self.redeemed {
            return Err(RedeemError::AlreadyRedeemed);
        }
        if self.status == CouponStatus::Expired || self.is_past_expiry(now) {
            return Err(RedeemError::Expired);
        }

        let stamp = crate::time_utils::format_utc_rfc3339(now);
        self.redeemed = true;
        self.redeemed_at = Some(stamp.clone());
        self.updated_at = stamp;
        Ok(())
    }
}

/// Catalog view of a private coupon, as returned by the public sync route.
/// Carries no owner or redemption state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCoupon {
    pub id: String,
    pub brand_name: String,
    pub coupon_name: Option<String>,
    pub coupon_title: String,
    pub description: Option<String>,
    pub expire_by: Option<String>,
    pub category_label: Option<String>,
    pub use_coupon_via: Option<UsageChannel>,
    pub discount_type: Option<String>,
    pub discount_value: Option<f64>,
    pub minimum_order: Option<f64>,
    pub coupon_code: Option<String>,
    pub coupon_visiting_link: Option<String>,
    pub terms: Option<String>,
    pub status: CouponStatus,
    pub added_method: AddedMethod,
}

impl From<PrivateCoupon> for CatalogCoupon {
    fn from(c: PrivateCoupon) -> Self {
        Self {
            id: c.id,
            brand_name: c.brand_name,
            coupon_name: c.coupon_name,
            coupon_title: c.coupon_title,
            description: c.description,
            expire_by: c.expire_by,
            category_label: c.category_label,
            use_coupon_via: c.use_coupon_via,
            discount_type: c.discount_type,
            discount_value: c.discount_value,
            minimum_order: c.minimum_order,
            coupon_code: c.coupon_code,
            coupon_visiting_link: c.coupon_visiting_link,
            terms: c.terms,
            status: c.status,
            added_method: c.added_method,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RedeemError {
    #[error("Coupon has already been redeemed")]
    AlreadyRedeemed,
    #[error("Coupon has expired")]
    Expired,
}

impl From<RedeemError> for crate::error::AppError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::AlreadyRedeemed => crate::error::AppError::Conflict(err.to_string()),
            RedeemError::Expired => crate::error::AppError::validation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> PrivateCoupon {
        PrivateCoupon {
            id: "p1".into(),
            user_id: "uid-1".into(),
            brand_name: "Myntra".into(),
            brand_key: "myntra".into(),
            coupon_name: None,
            coupon_title: "Extra 10% off".into(),
            description: None,
            expire_by: Some("2026-06-30T23:59:59Z".into()),
            category_label: Some("Fashion".into()),
            use_coupon_via: Some(UsageChannel::Online),
            discount_type: Some("percentage".into()),
            discount_value: Some(10.0),
            minimum_order: None,
            coupon_code: Some("MYN10".into()),
            coupon_visiting_link: None,
            terms: None,
            status: CouponStatus::Active,
            added_method: AddedMethod::Manual,
            redeemed: false,
            redeemed_at: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_redeem_once() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let mut coupon = sample();

        coupon.redeem(now).unwrap();
        assert!(coupon.redeemed);
        assert_eq!(coupon.redeemed_at.as_deref(), Some("2026-06-01T12:00:00Z"));
        assert_eq!(coupon.redeem(now), Err(RedeemError::AlreadyRedeemed));
    }

    #[test]
    fn test_redeem_after_expiry_fails() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut coupon = sample();
        assert_eq!(coupon.redeem(now), Err(RedeemError::Expired));
        assert!(!coupon.redeemed);
    }

    #[test]
    fn test_catalog_methods() {
        assert!(!AddedMethod::Manual.is_catalog());
        assert!(AddedMethod::Sync.is_catalog());
        assert!(AddedMethod::Seed.is_catalog());
        assert_eq!(
            serde_json::to_value(AddedMethod::Seed).unwrap(),
            AddedMethod::Seed.as_str()
        );
    }

    #[test]
    fn test_catalog_view_drops_owner_and_redemption() {
        let mut coupon = sample();
        coupon.added_method = AddedMethod::Seed;
        coupon.redeemed = true;

        let json = serde_json::to_value(CatalogCoupon::from(coupon)).unwrap();
        assert!(json.get("userId").is_none());
        assert!(json.get("redeemed").is_none());
        assert!(json.get("redeemedAt").is_none());
        assert_eq!(json["couponCode"], "MYN10");
        assert_eq!(json["addedMethod"], "seed");
    }

    #[test]
    fn test_ownership() {
        let coupon = sample();
        assert!(coupon.is_owned_by("uid-1"));
        assert!(!coupon.is_owned_by("uid-2"));
    }
}
