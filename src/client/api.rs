// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed HTTP client for the coupon API.

use crate::client::SyncedAppStore;
use crate::models::{CatalogCoupon, PrivateCoupon, User};
use crate::response::{ApiResponse, ErrorEnvelope};
use crate::routes::auth::UserPayload;
use crate::routes::coupons::CouponListPayload;
use crate::routes::private_coupons::{PrivateCouponPayload, SyncPayload, MAX_SYNC_BRANDS};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response contained no data")]
    MissingData,
    #[error("not signed in")]
    NotSignedIn,
}

impl ClientError {
    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CouponQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// API client. Holds the bearer token once signed in.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub async fn signup(&self, input: &SignupInput) -> Result<User, ClientError> {
        let req = self.request(Method::POST, "/api/auth/signup").json(input);
        Ok(self.send::<UserPayload>(req).await?.user)
    }

    pub async fn login(&self, uid: &str) -> Result<User, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/login")
            .json(&serde_json::json!({ "uid": uid }));
        Ok(self.send::<UserPayload>(req).await?.user)
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        let req = self.authed(Method::GET, "/api/auth/profile")?;
        Ok(self.send::<UserPayload>(req).await?.user)
    }

    pub async fn list_coupons(&self, query: &CouponQuery) -> Result<CouponListPayload, ClientError> {
        let req = self.request(Method::GET, "/api/coupons").query(query);
        self.send(req).await
    }

    pub async fn sync_private_coupons(
        &self,
        brands: &[String],
    ) -> Result<Vec<CatalogCoupon>, ClientError> {
        let req = self
            .request(Method::POST, "/api/private-coupons/sync")
            .json(&serde_json::json!({ "brands": brands }));
        Ok(self.send::<SyncPayload>(req).await?.coupons)
    }

    /// Sync coupons for every app in the local store, in batches the
    /// server accepts.
    pub async fn sync_from_store(
        &self,
        store: &SyncedAppStore,
    ) -> Result<Vec<CatalogCoupon>, ClientError> {
        let mut coupons = Vec::new();
        for batch in sync_batches(&store.app_names()) {
            coupons.extend(self.sync_private_coupons(batch).await?);
        }
        Ok(coupons)
    }

    pub async fn redeem_private_coupon(&self, id: &str) -> Result<PrivateCoupon, ClientError> {
        let path = format!("/api/private-coupons/{}", urlencoding::encode(id));
        let req = self.authed(Method::POST, &format!("{path}/redeem"))?;
        Ok(self.send::<PrivateCouponPayload>(req).await?.coupon)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotSignedIn);
        }
        Ok(self.request(method, path))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode_envelope(status, &body)
    }
}

/// Split brand names into request-sized batches.
pub fn sync_batches(brands: &[String]) -> std::slice::Chunks<'_, String> {
    brands.chunks(MAX_SYNC_BRANDS)
}

/// Unwrap the response envelope, turning failures into [`ClientError::Api`].
pub fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, ClientError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .map(|e| e.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: ApiResponse<T> = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(ClientError::Api {
            status: if envelope.status_code == 0 {
                status.as_u16()
            } else {
                envelope.status_code
            },
            message: envelope.message,
        });
    }
    envelope.data.ok_or(ClientError::MissingData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let body = br#"{"success":true,"statusCode":200,"message":"ok","data":{"user":{
            "uid":"u1","name":"Jane Doe","email":"jane@example.com","phone":"9876543210",
            "isActive":true,"profilePicture":null,"createdAt":"2026-01-01T00:00:00Z",
            "updatedAt":"2026-01-01T00:00:00Z","lastLogin":null}}}"#;
        let payload: UserPayload = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(payload.user.uid, "u1");
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = br#"{"success":false,"statusCode":409,"message":"Coupon has already been redeemed","data":null}"#;
        let err = decode_envelope::<UserPayload>(StatusCode::CONFLICT, body).unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Coupon has already been redeemed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_non_json_error() {
        let err = decode_envelope::<UserPayload>(StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_sync_batches_respect_limit() {
        let brands: Vec<String> = (0..120).map(|i| format!("brand{i}")).collect();
        let sizes: Vec<usize> = sync_batches(&brands).map(<[String]>::len).collect();
        assert_eq!(sizes, vec![50, 50, 20]);

        assert_eq!(sync_batches(&[]).count(), 0);
    }

    #[tokio::test]
    async fn test_authed_calls_need_token() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            client.profile().await,
            Err(ClientError::NotSignedIn)
        ));
    }
}
