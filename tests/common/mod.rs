// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use dealora::config::{Config, Environment};
use dealora::db::FirestoreDb;
use dealora::routes::create_router;
use dealora::services::FirebaseTokenVerifier;
use dealora::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;

pub const TEST_PROJECT: &str = "dealora-test";
pub const TEST_KID: &str = "test-key-1";

const PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/test_rsa_private.pem");
const PUBLIC_KEY_PEM: &[u8] = include_bytes!("../fixtures/test_rsa_public.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

fn build_app(config: Config, db: FirestoreDb, verifier: Option<FirebaseTokenVerifier>) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config,
        db,
        token_verifier: verifier.map(Arc::new),
    });
    (create_router(state.clone()), state)
}

/// Test app with an offline database and the development auth bypass.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    build_app(Config::test_default(), FirestoreDb::new_mock(), None)
}

/// Test app running as production (no debug fields in error bodies).
#[allow(dead_code)]
pub fn create_production_app() -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.environment = Environment::Production;
    config.firebase_project_id = Some(TEST_PROJECT.to_string());
    build_app(config, FirestoreDb::new_mock(), Some(static_verifier()))
}

/// Test app that verifies tokens against the fixture key.
#[allow(dead_code)]
pub fn create_verified_app(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.firebase_project_id = Some(TEST_PROJECT.to_string());
    build_app(config, db, Some(static_verifier()))
}

pub fn static_verifier() -> FirebaseTokenVerifier {
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM).expect("fixture public key");
    FirebaseTokenVerifier::new_with_static_key(TEST_PROJECT, TEST_KID, key)
        .expect("static verifier")
}

#[derive(Debug, Clone, Serialize)]
pub struct TestClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: i64,
    pub email: Option<String>,
}

impl TestClaims {
    /// Claims valid for the test project, issued now.
    #[allow(dead_code)]
    pub fn for_uid(uid: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: format!("https://securetoken.google.com/{TEST_PROJECT}"),
            aud: TEST_PROJECT.to_string(),
            sub: uid.to_string(),
            iat: now,
            exp: now + 3600,
            auth_time: now,
            email: Some(format!("{uid}@example.com")),
        }
    }
}

/// Sign claims with the fixture key under `kid`.
#[allow(dead_code)]
pub fn sign_token(claims: &TestClaims, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM).expect("fixture private key");
    encode(&header, claims, &key).expect("sign test token")
}

/// A valid ID token for `uid`.
#[allow(dead_code)]
pub fn create_test_id_token(uid: &str) -> String {
    sign_token(&TestClaims::for_uid(uid), TEST_KID)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Unique suffix for emulator documents.
#[allow(dead_code)]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", dealora::db::new_document_id(prefix))
}
