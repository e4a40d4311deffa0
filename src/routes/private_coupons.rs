// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Private coupon routes.
//!
//! `sync` is public so a device can discover coupons for its linked apps
//! before the user signs in. Everything else is scoped to the caller.

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::db::{new_document_id, PrivateCouponFilter};
use crate::error::{AppError, Result, VALIDATION_FAILED};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::models::{
    AddedMethod, CatalogCoupon, Coupon, CouponStatus, PrivateCoupon, UsageChannel,
};
use crate::response::ApiResponse;
use crate::time_utils::{format_utc_rfc3339, normalize_date, parse_flexible_date};
use crate::validation::{
    trimmed, trimmed_list, validate_date, validate_http_url, validate_status,
    validate_usage_channel, ValidatedJson, ValidatedQuery,
};
use crate::AppState;

pub const MAX_SYNC_BRANDS: usize = 50;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route(
            "/api/private-coupons",
            get(list_private_coupons).post(add_private_coupon),
        )
        .route(
            "/api/private-coupons/{id}",
            get(get_private_coupon).delete(delete_private_coupon),
        )
        .route("/api/private-coupons/{id}/redeem", post(redeem_private_coupon))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/private-coupons/sync", post(sync_private_coupons))
        .merge(protected)
}

#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    #[serde(default, deserialize_with = "trimmed_list")]
    #[validate(length(
        min = 1,
        max = 50,
        message = "brands must contain between 1 and 50 brand names"
    ))]
    pub brands: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PrivateCouponListQuery {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddPrivateCouponRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Brand name is required"),
        length(max = 100, message = "Brand name is too long")
    )]
    pub brand_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub coupon_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Coupon title is required"),
        length(max = 200, message = "Coupon title is too long")
    )]
    pub coupon_title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_date"))]
    pub expire_by: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub category_label: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_usage_channel"))]
    pub use_coupon_via: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub discount_type: Option<String>,
    #[validate(range(min = 0.0, message = "Discount value cannot be negative"))]
    pub discount_value: Option<f64>,
    #[validate(range(min = 0.0, message = "Minimum order cannot be negative"))]
    pub minimum_order: Option<f64>,
    #[serde(default, deserialize_with = "trimmed")]
    pub coupon_code: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_http_url"))]
    pub coupon_visiting_link: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub terms: Option<String>,
}

impl AddPrivateCouponRequest {
    /// Build the stored record for `uid`. The request must already be validated.
    pub fn into_coupon(self, uid: &str, now: chrono::DateTime<Utc>) -> Result<PrivateCoupon> {
        let (Some(brand_name), Some(coupon_title)) = (self.brand_name, self.coupon_title) else {
            return Err(AppError::validation(VALIDATION_FAILED));
        };

        let expire_by = self.expire_by.as_deref().and_then(normalize_date);
        if let Some(expiry) = self.expire_by.as_deref().and_then(parse_flexible_date) {
            if expiry <= now {
                return Err(AppError::validation("Expiry date must be in the future"));
            }
        }

        let stamp = format_utc_rfc3339(now);
        Ok(PrivateCoupon {
            id: new_document_id(&format!("{uid}:{coupon_title}")),
            user_id: uid.to_string(),
            brand_key: Coupon::brand_key(&brand_name),
            brand_name,
            coupon_name: self.coupon_name,
            coupon_title,
            description: self.description,
            expire_by,
            category_label: self.category_label,
            use_coupon_via: self.use_coupon_via.as_deref().and_then(UsageChannel::parse),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            minimum_order: self.minimum_order,
            coupon_code: self.coupon_code,
            coupon_visiting_link: self.coupon_visiting_link,
            terms: self.terms,
            status: CouponStatus::Active,
            added_method: AddedMethod::Manual,
            redeemed: false,
            redeemed_at: None,
            created_at: stamp.clone(),
            updated_at: stamp,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateCouponListPayload {
    pub coupons: Vec<PrivateCoupon>,
    pub count: usize,
}

impl From<Vec<PrivateCoupon>> for PrivateCouponListPayload {
    fn from(coupons: Vec<PrivateCoupon>) -> Self {
        Self {
            count: coupons.len(),
            coupons,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncPayload {
    pub coupons: Vec<CatalogCoupon>,
    pub count: usize,
}

impl From<Vec<PrivateCoupon>> for SyncPayload {
    fn from(coupons: Vec<PrivateCoupon>) -> Self {
        let coupons: Vec<CatalogCoupon> = coupons
            .into_iter()
            .filter(|c| c.added_method.is_catalog())
            .map(CatalogCoupon::from)
            .collect();
        Self {
            count: coupons.len(),
            coupons,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateCouponPayload {
    pub coupon: PrivateCoupon,
}

async fn sync_private_coupons(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SyncRequest>,
) -> Result<ApiResponse<SyncPayload>> {
    let coupons = state.db.find_private_coupons_by_brands(&req.brands).await?;

    tracing::info!(
        brands = req.brands.len(),
        found = coupons.len(),
        "Private coupons synced"
    );
    Ok(ApiResponse::ok(
        "Coupons synced successfully",
        coupons.into(),
    ))
}

async fn list_private_coupons(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedQuery(query): ValidatedQuery<PrivateCouponListQuery>,
) -> Result<ApiResponse<PrivateCouponListPayload>> {
    let filter = PrivateCouponFilter {
        status: query.status.as_deref().and_then(CouponStatus::parse),
        brand: query.brand,
    };
    let coupons = state
        .db
        .list_private_coupons_for_user(&auth.uid, &filter)
        .await?;

    Ok(ApiResponse::ok(
        "Private coupons fetched successfully",
        coupons.into(),
    ))
}

async fn add_private_coupon(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<AddPrivateCouponRequest>,
) -> Result<ApiResponse<PrivateCouponPayload>> {
    let coupon = req.into_coupon(&auth.uid, Utc::now())?;
    state.db.create_private_coupon(&coupon).await?;

    tracing::info!(uid = %auth.uid, coupon_id = %coupon.id, "Private coupon added");
    Ok(ApiResponse::created(
        "Coupon added successfully",
        PrivateCouponPayload { coupon },
    ))
}

/// Load a private coupon the caller owns.
async fn load_owned(state: &AppState, id: &str, uid: &str) -> Result<PrivateCoupon> {
    let coupon = state
        .db
        .get_private_coupon(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;

    if !coupon.is_owned_by(uid) {
        tracing::warn!(uid = %uid, coupon_id = %id, "Access to another user's coupon denied");
        return Err(AppError::Forbidden(
            "You do not have permission to access this coupon".to_string(),
        ));
    }
    Ok(coupon)
}

async fn get_private_coupon(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<ApiResponse<PrivateCouponPayload>> {
    let coupon = load_owned(&state, &id, &auth.uid).await?;
    Ok(ApiResponse::ok(
        "Coupon fetched successfully",
        PrivateCouponPayload { coupon },
    ))
}

async fn redeem_private_coupon(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<ApiResponse<PrivateCouponPayload>> {
    let mut coupon = load_owned(&state, &id, &auth.uid).await?;
    coupon.redeem(Utc::now())?;
    state.db.update_private_coupon(&coupon).await?;

    tracing::info!(uid = %auth.uid, coupon_id = %id, "Private coupon redeemed");
    Ok(ApiResponse::ok(
        "Coupon redeemed successfully",
        PrivateCouponPayload { coupon },
    ))
}

async fn delete_private_coupon(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>> {
    load_owned(&state, &id, &auth.uid).await?;
    state.db.delete_private_coupon(&id).await?;

    tracing::info!(uid = %auth.uid, coupon_id = %id, "Private coupon deleted");
    Ok(ApiResponse::ok(
        "Coupon deleted successfully",
        serde_json::json!({ "id": id }),
    ))
}
