// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: signup, login and profile.

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result, VALIDATION_FAILED};
use crate::middleware::auth::{check_account, require_auth, AuthUser};
use crate::models::User;
use crate::response::ApiResponse;
use crate::time_utils::now_rfc3339;
use crate::validation::{
    trimmed, validate_http_url, validate_person_name, validate_phone, ValidatedJson,
};
use crate::AppState;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/api/auth/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .merge(protected)
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserPayload {
    pub user: User,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Firebase UID is required"),
        length(max = 128, message = "Firebase UID is too long")
    )]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Name is required"),
        length(
            min = 2,
            max = 100,
            message = "Name must be between 2 and 100 characters"
        ),
        custom(function = "validate_person_name")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Email is required"),
        email(message = "Please provide a valid email address")
    )]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Phone number is required"),
        custom(function = "validate_phone")
    )]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required(message = "Firebase UID is required"))]
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        length(
            min = 2,
            max = 100,
            message = "Name must be between 2 and 100 characters"
        ),
        custom(function = "validate_person_name")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_http_url"))]
    pub profile_picture: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

impl ProfileUpdateRequest {
    /// Apply the provided fields. Returns false if nothing was provided.
    pub fn apply(self, user: &mut User) -> bool {
        let mut changed = false;
        if let Some(name) = self.name {
            user.name = name;
            changed = true;
        }
        if let Some(picture) = self.profile_picture {
            user.profile_picture = Some(picture);
            changed = true;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
            changed = true;
        }
        changed
    }
}

/// Register the profile for an identity-provider account.
async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<ApiResponse<UserPayload>> {
    let (Some(uid), Some(name), Some(email), Some(phone)) =
        (req.uid, req.name, req.email, req.phone)
    else {
        return Err(AppError::validation(VALIDATION_FAILED));
    };

    let user = User::new(uid, name, email.to_lowercase(), phone, &now_rfc3339());
    state.db.create_user(&user).await?;

    tracing::info!(uid = %user.uid, "User registered");
    Ok(ApiResponse::created(
        "User registered successfully",
        UserPayload { user },
    ))
}

/// Record a login for an existing account.
async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<UserPayload>> {
    let uid = req
        .uid
        .ok_or_else(|| AppError::validation(VALIDATION_FAILED))?;

    let mut user = check_account(state.db.get_user(&uid).await?)?;
    let now = now_rfc3339();
    user.last_login = Some(now.clone());
    user.updated_at = now;
    state.db.update_user(&user).await?;

    tracing::info!(uid = %user.uid, "User logged in");
    Ok(ApiResponse::ok("Login successful", UserPayload { user }))
}

async fn get_profile(Extension(auth): Extension<AuthUser>) -> ApiResponse<UserPayload> {
    ApiResponse::ok(
        "Profile fetched successfully",
        UserPayload { user: auth.user },
    )
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<ProfileUpdateRequest>,
) -> Result<ApiResponse<UserPayload>> {
    let mut user = auth.user;
    if !req.apply(&mut user) {
        return Err(AppError::validation(
            "Provide at least one of name, phone or profilePicture",
        ));
    }
    user.updated_at = now_rfc3339();
    state.db.update_user(&user).await?;

    tracing::info!(uid = %user.uid, "Profile updated");
    Ok(ApiResponse::ok(
        "Profile updated successfully",
        UserPayload { user },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_json(body: serde_json::Value) -> SignupRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_signup_valid() {
        let req = signup_json(serde_json::json!({
            "uid": " abc123 ",
            "name": "Priya Sharma",
            "email": "Priya@Example.com",
            "phone": "+919876543210"
        }));
        assert!(req.validate().is_ok());
        assert_eq!(req.uid.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_signup_missing_and_blank_fields() {
        let req = signup_json(serde_json::json!({
            "uid": "abc123",
            "name": "   ",
            "phone": "9876543210"
        }));
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("phone"));
    }

    #[test]
    fn test_signup_rejects_bad_name_and_phone() {
        let req = signup_json(serde_json::json!({
            "uid": "abc123",
            "name": "X1",
            "email": "x@example.com",
            "phone": "12345"
        }));
        let fields = req.validate().unwrap_err();
        let fields = fields.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn test_profile_update_apply() {
        let mut user = User::new(
            "u".into(),
            "Old Name".into(),
            "a@b.co".into(),
            "9876543210".into(),
            "2026-01-01T00:00:00Z",
        );
        let req: ProfileUpdateRequest =
            serde_json::from_value(serde_json::json!({"name": "New Name", "phone": " "})).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.apply(&mut user));
        assert_eq!(user.name, "New Name");
        assert_eq!(user.phone, "9876543210");

        let empty: ProfileUpdateRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!empty.apply(&mut user));
    }

    #[test]
    fn test_profile_update_rejects_non_http_picture() {
        let req: ProfileUpdateRequest =
            serde_json::from_value(serde_json::json!({"profilePicture": "javascript:alert(1)"}))
                .unwrap();
        assert!(req.validate().is_err());
    }
}
