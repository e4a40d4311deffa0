// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API client tests against a locally served router.

use axum::{routing::post, Json, Router};
use dealora::client::{ApiClient, ClientError, CouponQuery, SignupInput, SyncedAppStore};
use dealora::models::SyncedApp;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

mod common;

/// Serve the offline test app on an ephemeral port.
async fn spawn_app() -> String {
    let (app, _) = common::create_test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_validation_error_surfaces_message() {
    let client = ApiClient::new(spawn_app().await).unwrap();

    let err = client
        .signup(&SignupInput {
            uid: "u1".into(),
            name: "Jane Doe".into(),
            email: "not-an-email".into(),
            phone: "9876543210".into(),
        })
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Validation failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let client = ApiClient::new(spawn_app().await).unwrap();

    let err = client
        .list_coupons(&CouponQuery {
            brand: Some("Swiggy".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_redeem_requires_sign_in() {
    let client = ApiClient::new(spawn_app().await).unwrap();
    assert!(matches!(
        client.redeem_private_coupon("abc").await,
        Err(ClientError::NotSignedIn)
    ));

    // Dev bypass treats the raw token as a UID; the offline lookup fails.
    let client = client.with_token("dev-uid");
    let err = client.redeem_private_coupon("abc").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_sync_from_empty_store_skips_request() {
    // Nothing listens here; an empty store must not send anything.
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let store = SyncedAppStore::new();
    assert!(client.sync_from_store(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_from_store_sends_app_names() {
    let client = ApiClient::new(spawn_app().await).unwrap();
    let store = SyncedAppStore::new();
    store.insert(SyncedApp::new("com.application.zomato", "Zomato"));

    // Validation passes; the offline database answers with a server error.
    let err = client.sync_from_store(&store).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_sync_from_store_batches_brands() {
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let recorder = seen.clone();
    let app = Router::new().route(
        "/api/private-coupons/sync",
        post(move |Json(body): Json<Value>| {
            let recorder = recorder.clone();
            async move {
                let brands = body["brands"].as_array().map(Vec::len).unwrap_or(0);
                recorder.lock().unwrap().push(brands);
                Json(json!({
                    "success": true,
                    "statusCode": 200,
                    "message": "Coupons synced successfully",
                    "data": { "coupons": [], "count": 0 }
                }))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let store = SyncedAppStore::new();
    store.insert_many((0..75).map(|i| SyncedApp::new(format!("com.app{i}"), format!("App {i}"))));

    let client = ApiClient::new(format!("http://{addr}")).unwrap();
    assert!(client.sync_from_store(&store).await.unwrap().is_empty());

    let mut sizes = seen.lock().unwrap().clone();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![25, 50]);
}
