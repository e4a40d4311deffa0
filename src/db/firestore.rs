// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, with an email claim collection enforcing uniqueness)
//! - Coupons (scraped public listings)
//! - Private coupons (per-user, redeemable)
//!
//! Firestore errors are reclassified into the API taxonomy by
//! `From<FirestoreError> for AppError`, so most methods just use `?`.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{AddedMethod, Coupon, CouponStatus, PrivateCoupon, User};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Filter for public coupon listings.
#[derive(Debug, Clone, Default)]
pub struct CouponFilter {
    pub status: Option<CouponStatus>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

/// Filter for a user's private coupons.
#[derive(Debug, Clone, Default)]
pub struct PrivateCouponFilter {
    pub status: Option<CouponStatus>,
    pub brand: Option<String>,
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// One page of public coupons.
#[derive(Debug, Clone, Default)]
pub struct CouponPage {
    pub coupons: Vec<Coupon>,
    pub has_more: bool,
}

/// Marker document whose ID is the encoded email; insert fails if taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailClaim {
    uid: String,
    email: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by UID.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await?)
    }

    /// Look up a user by (lowercased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await?;
        Ok(users.into_iter().next())
    }

    /// Create a new user.
    ///
    /// Claims the email first so two accounts can never share one; a taken
    /// email or UID is a conflict.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;
        let claim_id = urlencoding::encode(&user.email).into_owned();

        let _: EmailClaim = client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(&claim_id)
            .object(&EmailClaim {
                uid: user.uid.clone(),
                email: user.email.clone(),
            })
            .execute()
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::duplicate("email", &user.email),
                other => other,
            })?;

        let inserted: Result<User, _> = client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await;

        if let Err(e) = inserted {
            // Release the claim so the email is usable again.
            if let Err(cleanup) = client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(&claim_id)
                .execute()
                .await
            {
                tracing::warn!(error = %cleanup, email = %user.email, "Failed to release email claim");
            }
            return Err(match AppError::from(e) {
                AppError::Conflict(_) => AppError::duplicate("uid", &user.uid),
                other => other,
            });
        }

        tracing::info!(uid = %user.uid, "User created");
        Ok(())
    }

    /// Overwrite an existing user document.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await?;
        Ok(())
    }

    // ─── Coupon Operations ───────────────────────────────────────

    /// List public coupons, newest first.
    ///
    /// Fetches one extra row to tell whether a further page exists.
    pub async fn list_coupons(
        &self,
        filter: &CouponFilter,
        page: PageRequest,
    ) -> Result<CouponPage, AppError> {
        let status = filter.status.map(|s| s.as_str());
        let category = filter.category.clone();
        let brand_key = filter.brand.as_deref().map(Coupon::brand_key);

        let mut coupons: Vec<Coupon> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COUPONS)
            .filter(move |q| {
                q.for_all([
                    status.and_then(|s| q.field("status").eq(s)),
                    category
                        .clone()
                        .and_then(|c| q.field("categoryLabel").eq(c)),
                    brand_key.clone().and_then(|b| q.field("brandKey").eq(b)),
                ])
            })
            .order_by([("updatedAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(page.limit.saturating_add(1))
            .offset(page.offset())
            .obj::<Coupon>()
            .query()
            .await?;

        let has_more = coupons.len() > page.limit as usize;
        coupons.truncate(page.limit as usize);
        Ok(CouponPage { coupons, has_more })
    }

    pub async fn get_coupon(&self, id: &str) -> Result<Option<Coupon>, AppError> {
        Ok(self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COUPONS)
            .obj()
            .one(id)
            .await?)
    }

    /// Insert or refresh scraped coupons.
    ///
    /// Each record is reconciled against the stored document (see
    /// [`Coupon::reconcile`]) at `now`. Returns the number of documents written.
    pub async fn upsert_coupons(
        &self,
        coupons: &[Coupon],
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let client = self.get_client()?;

        let written = stream::iter(coupons.to_vec())
            .map(|mut coupon| async move {
                let existing: Option<Coupon> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::COUPONS)
                    .obj()
                    .one(&coupon.id)
                    .await?;

                coupon.reconcile(existing.as_ref(), now);

                let _: Coupon = client
                    .fluent()
                    .update()
                    .in_col(collections::COUPONS)
                    .document_id(&coupon.id)
                    .object(&coupon)
                    .execute()
                    .await?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?
            .len();

        Ok(written)
    }

    /// Flip every active coupon whose expiry is before `now` to expired.
    pub async fn expire_coupons(&self, now: &str) -> Result<usize, AppError> {
        self.expire_in_collection::<Coupon, _, _>(
            collections::COUPONS,
            now,
            |c| c.id.clone(),
            |c, stamp| {
                c.status = CouponStatus::Expired;
                c.updated_at = stamp.to_string();
            },
        )
        .await
    }

    /// Delete expired coupons whose expiry is before `cutoff`.
    pub async fn delete_expired_coupons(&self, cutoff: &str) -> Result<usize, AppError> {
        let cutoff = cutoff.to_string();
        let stale: Vec<Coupon> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COUPONS)
            .filter(move |q| {
                q.for_all([
                    q.field("status").eq(CouponStatus::Expired.as_str()),
                    q.field("expireBy").less_than(cutoff.clone()),
                ])
            })
            .obj()
            .query()
            .await?;

        let count = stale.len();
        self.batch_delete(&stale, collections::COUPONS, |c: &Coupon| c.id.clone())
            .await?;
        Ok(count)
    }

    // ─── Private Coupon Operations ───────────────────────────────

    /// A user's private coupons, newest first.
    pub async fn list_private_coupons_for_user(
        &self,
        uid: &str,
        filter: &PrivateCouponFilter,
    ) -> Result<Vec<PrivateCoupon>, AppError> {
        let uid = uid.to_string();
        let status = filter.status.map(|s| s.as_str());
        let brand_key = filter.brand.as_deref().map(Coupon::brand_key);

        Ok(self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PRIVATE_COUPONS)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(uid.clone()),
                    status.and_then(|s| q.field("status").eq(s)),
                    brand_key.clone().and_then(|b| q.field("brandKey").eq(b)),
                ])
            })
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj::<PrivateCoupon>()
            .query()
            .await?)
    }

    /// Active catalog coupons (seeded or synced, never manual) for any of
    /// the given brands (case-insensitive).
    pub async fn find_private_coupons_by_brands(
        &self,
        brands: &[String],
    ) -> Result<Vec<PrivateCoupon>, AppError> {
        let client = self.get_client()?;

        let mut keys: Vec<String> = brands.iter().map(|b| Coupon::brand_key(b)).collect();
        keys.sort();
        keys.dedup();

        let mut found = stream::iter(keys)
            .map(|key| async move {
                client
                    .fluent()
                    .select()
                    .from(collections::PRIVATE_COUPONS)
                    .filter(move |q| {
                        q.for_all([
                            q.field("brandKey").eq(key.clone()),
                            q.field("status").eq(CouponStatus::Active.as_str()),
                            q.field("addedMethod").is_in(catalog_methods()),
                        ])
                    })
                    .obj::<PrivateCoupon>()
                    .query()
                    .await
                    .map_err(AppError::from)
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Vec<PrivateCoupon>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, AppError>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        found.sort_by(|a, b| {
            a.brand_key
                .cmp(&b.brand_key)
                .then_with(|| a.coupon_title.cmp(&b.coupon_title))
        });
        Ok(found)
    }

    pub async fn get_private_coupon(&self, id: &str) -> Result<Option<PrivateCoupon>, AppError> {
        Ok(self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PRIVATE_COUPONS)
            .obj()
            .one(id)
            .await?)
    }

    pub async fn create_private_coupon(&self, coupon: &PrivateCoupon) -> Result<(), AppError> {
        let _: PrivateCoupon = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PRIVATE_COUPONS)
            .document_id(&coupon.id)
            .object(coupon)
            .execute()
            .await?;
        Ok(())
    }

    pub async fn update_private_coupon(&self, coupon: &PrivateCoupon) -> Result<(), AppError> {
        let _: PrivateCoupon = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PRIVATE_COUPONS)
            .document_id(&coupon.id)
            .object(coupon)
            .execute()
            .await?;
        Ok(())
    }

    pub async fn delete_private_coupon(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PRIVATE_COUPONS)
            .document_id(id)
            .execute()
            .await?;
        Ok(())
    }

    /// Flip every active private coupon whose expiry is before `now`.
    pub async fn expire_private_coupons(&self, now: &str) -> Result<usize, AppError> {
        self.expire_in_collection::<PrivateCoupon, _, _>(
            collections::PRIVATE_COUPONS,
            now,
            |c| c.id.clone(),
            |c, stamp| {
                c.status = CouponStatus::Expired;
                c.updated_at = stamp.to_string();
            },
        )
        .await
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Page through active documents with `expireBy < now` and rewrite them
    /// as expired, one transaction per page.
    async fn expire_in_collection<T, I, M>(
        &self,
        collection: &'static str,
        now: &str,
        id_extractor: I,
        mark_expired: M,
    ) -> Result<usize, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        I: Fn(&T) -> String + Send + Sync,
        M: Fn(&mut T, &str) + Send + Sync,
    {
        let client = self.get_client()?;
        let mut total = 0;

        loop {
            let cutoff = now.to_string();
            let page: Vec<T> = client
                .fluent()
                .select()
                .from(collection)
                .filter(move |q| {
                    q.for_all([
                        q.field("status").eq(CouponStatus::Active.as_str()),
                        q.field("expireBy").less_than(cutoff.clone()),
                    ])
                })
                .limit(BATCH_SIZE as u32)
                .obj()
                .query()
                .await?;

            let count = page.len();
            if count == 0 {
                break;
            }

            let mut transaction = client.begin_transaction().await?;
            for mut item in page {
                mark_expired(&mut item, now);
                client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id_extractor(&item))
                    .object(&item)
                    .add_to_transaction(&mut transaction)?;
            }
            transaction.commit().await?;

            total += count;
            tracing::debug!(collection, count, "Expired batch committed");

            if count < BATCH_SIZE {
                break;
            }
        }

        Ok(total)
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client.begin_transaction().await?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)?;
            }

            transaction.commit().await?;
        }

        Ok(())
    }
}

fn catalog_methods() -> Vec<&'static str> {
    AddedMethod::CATALOG.iter().map(|m| m.as_str()).collect()
}

/// New random-looking document ID for user-created records.
pub fn new_document_id(seed: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(n.to_le_bytes());
    hex::encode(&hasher.finalize()[..10])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest { page: 1, limit: 20 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 20 }.offset(), 40);
        assert_eq!(PageRequest { page: 0, limit: 20 }.offset(), 0);
    }

    #[test]
    fn test_document_ids_are_unique() {
        let a = new_document_id("uid-1");
        let b = new_document_id("uid-1");
        assert_ne!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[tokio::test]
    async fn test_offline_mock_reports_database_error() {
        let db = FirestoreDb::new_mock();
        let err = db.get_user("uid-1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
