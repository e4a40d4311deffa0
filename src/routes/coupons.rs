// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public coupon listings.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::db::{CouponFilter, PageRequest};
use crate::error::{AppError, Result};
use crate::models::{Coupon, CouponStatus};
use crate::response::ApiResponse;
use crate::validation::{trimmed, validate_status, ValidatedQuery};
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/coupons", get(list_coupons))
        .route("/api/coupons/{id}", get(get_coupon))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CouponListQuery {
    #[serde(default, deserialize_with = "trimmed")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

impl CouponListQuery {
    pub fn filter(&self) -> CouponFilter {
        CouponFilter {
            status: Some(
                self.status
                    .as_deref()
                    .and_then(CouponStatus::parse)
                    .unwrap_or_default(),
            ),
            category: self.category.clone(),
            brand: self.brand.clone(),
        }
    }

    pub fn page(&self) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub count: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CouponListPayload {
    pub coupons: Vec<Coupon>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CouponPayload {
    pub coupon: Coupon,
}

async fn list_coupons(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<CouponListQuery>,
) -> Result<ApiResponse<CouponListPayload>> {
    let page = query.page();
    let result = state.db.list_coupons(&query.filter(), page).await?;

    let pagination = Pagination {
        page: page.page,
        limit: page.limit,
        count: result.coupons.len(),
        has_more: result.has_more,
    };
    Ok(ApiResponse::ok(
        "Coupons fetched successfully",
        CouponListPayload {
            coupons: result.coupons,
            pagination,
        },
    ))
}

async fn get_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CouponPayload>> {
    let coupon = state
        .db
        .get_coupon(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;

    Ok(ApiResponse::ok(
        "Coupon fetched successfully",
        CouponPayload { coupon },
    ))
}
