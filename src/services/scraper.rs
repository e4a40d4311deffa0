// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coupon feed scraper.
//!
//! Each source is an HTTP endpoint returning JSON coupon records, either as a
//! bare array or wrapped as `{"coupons": [...]}`. Records are normalized into
//! [`Coupon`]s and upserted by stable ID.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Coupon, CouponStatus, UsageChannel};
use crate::time_utils::{format_utc_rfc3339, normalize_date};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Coupon record as published by a feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoupon {
    #[serde(alias = "brand")]
    pub brand_name: Option<String>,
    #[serde(alias = "title")]
    pub coupon_title: Option<String>,
    #[serde(alias = "code")]
    pub coupon_code: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "expiry", alias = "expiresAt")]
    pub expire_by: Option<String>,
    #[serde(alias = "category")]
    pub category_label: Option<String>,
    #[serde(alias = "channel")]
    pub use_coupon_via: Option<String>,
    #[serde(alias = "link", alias = "url")]
    pub coupon_visiting_link: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
    List(Vec<RawCoupon>),
    Wrapped { coupons: Vec<RawCoupon> },
}

/// Outcome of one scrape run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub sources: usize,
    /// Raw records received across all sources
    pub fetched: usize,
    /// Documents written
    pub stored: usize,
    /// Records dropped during normalization or as duplicates
    pub skipped: usize,
    pub failed_sources: Vec<String>,
}

/// Fetches and normalizes coupons from configured feeds.
#[derive(Clone)]
pub struct CouponScraper {
    http: reqwest::Client,
    sources: Vec<String>,
}

impl CouponScraper {
    pub fn new(sources: Vec<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("dealora/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, sources })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Fetch one feed.
    pub async fn fetch_source(&self, url: &str) -> anyhow::Result<Vec<RawCoupon>> {
        let body: FeedBody = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match body {
            FeedBody::List(coupons) | FeedBody::Wrapped { coupons } => coupons,
        })
    }

    /// Fetch every source and normalize the results.
    ///
    /// A failing source is logged and recorded, never fatal.
    pub async fn collect(&self, now: DateTime<Utc>) -> (Vec<Coupon>, ScrapeReport) {
        let mut report = ScrapeReport {
            sources: self.sources.len(),
            ..Default::default()
        };
        let mut by_id: HashMap<String, Coupon> = HashMap::new();

        for source in &self.sources {
            let raw = match self.fetch_source(source).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Coupon source failed");
                    report.failed_sources.push(source.clone());
                    continue;
                }
            };

            tracing::debug!(source = %source, count = raw.len(), "Fetched coupon source");
            report.fetched += raw.len();

            for record in raw {
                let Some(coupon) = normalize(record, source, now) else {
                    report.skipped += 1;
                    continue;
                };
                // First occurrence of an offer wins.
                match by_id.entry(coupon.id.clone()) {
                    Entry::Occupied(_) => report.skipped += 1,
                    Entry::Vacant(slot) => {
                        slot.insert(coupon);
                    }
                }
            }
        }

        let mut coupons: Vec<Coupon> = by_id.into_values().collect();
        coupons.sort_by(|a, b| a.id.cmp(&b.id));
        (coupons, report)
    }

    /// Full scrape: fetch, normalize and upsert.
    pub async fn run(&self, db: &FirestoreDb) -> Result<ScrapeReport, AppError> {
        if self.sources.is_empty() {
            tracing::info!("No coupon sources configured; nothing to scrape");
            return Ok(ScrapeReport::default());
        }

        let (coupons, mut report) = self.collect(Utc::now()).await;
        report.stored = db.upsert_coupons(&coupons, Utc::now()).await?;

        tracing::info!(
            sources = report.sources,
            fetched = report.fetched,
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed_sources.len(),
            "Coupon scrape finished"
        );
        Ok(report)
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turn a feed record into a stored coupon.
///
/// Records without a brand or title are dropped. An unparseable expiry is
/// discarded; an expiry already in the past marks the coupon expired.
pub fn normalize(raw: RawCoupon, source: &str, now: DateTime<Utc>) -> Option<Coupon> {
    let brand_name = clean(raw.brand_name)?;
    let coupon_title = clean(raw.coupon_title)?;
    let coupon_code = clean(raw.coupon_code);

    let stamp = format_utc_rfc3339(now);
    let mut coupon = Coupon {
        id: Coupon::doc_id(&brand_name, coupon_code.as_deref(), &coupon_title),
        brand_key: Coupon::brand_key(&brand_name),
        brand_name,
        coupon_title,
        coupon_code,
        description: clean(raw.description),
        expire_by: clean(raw.expire_by).as_deref().and_then(normalize_date),
        category_label: clean(raw.category_label),
        use_coupon_via: clean(raw.use_coupon_via)
            .as_deref()
            .and_then(UsageChannel::parse),
        coupon_visiting_link: clean(raw.coupon_visiting_link),
        status: CouponStatus::Active,
        source: source.to_string(),
        created_at: stamp.clone(),
        updated_at: stamp,
    };

    if coupon.is_past_expiry(now) {
        coupon.status = CouponStatus::Expired;
    }
    Some(coupon)
}
