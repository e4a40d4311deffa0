// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error taxonomy with consistent API responses.
//!
//! Every failure reaching the HTTP boundary is an [`AppError`]. Lower-level
//! errors (Firestore, token decoding, request validation, JSON rejections)
//! are reclassified into the taxonomy by the `From` impls below.

use crate::response::{ErrorDetail, ErrorEnvelope};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};

pub const VALIDATION_FAILED: &str = "Validation failed";
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// One failing input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided. Please include Bearer token in Authorization header.")]
    MissingCredential,

    #[error("Invalid token format")]
    MalformedCredential,

    #[error("Token has expired. Please login again.")]
    ExpiredCredential,

    #[error("Invalid token. Please login again.")]
    InvalidCredential,

    #[error("User not found")]
    UserNotFound,

    #[error("User account is deactivated")]
    UserDeactivated,
}

impl AuthError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedCredential => "malformed_credential",
            AuthError::ExpiredCredential => "expired_credential",
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::UserNotFound => "user_not_found",
            AuthError::UserDeactivated => "user_deactivated",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::MalformedCredential,
            _ => AuthError::InvalidCredential,
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure without per-field detail.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Conflict on a unique field.
    pub fn duplicate(field: &str, value: &str) -> Self {
        AppError::Conflict(format!(
            "Duplicate field value: {field} = \"{value}\". Please use another value."
        ))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(AuthError::UserNotFound) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => INTERNAL_SERVER_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<FirestoreError> for AppError {
    fn from(err: FirestoreError) -> Self {
        match err {
            FirestoreError::DataConflictError(e) => {
                AppError::Conflict(format!("Duplicate value: {e}"))
            }
            FirestoreError::DataNotFoundError(e) => {
                AppError::NotFound(format!("Resource not found: {e}"))
            }
            FirestoreError::InvalidParametersError(e) => AppError::validation(format!("Invalid {e}")),
            FirestoreError::SerializeError(e) => {
                AppError::validation(format!("Invalid input data. {e}"))
            }
            FirestoreError::DeserializeError(e) => {
                AppError::validation(format!("Invalid input data. {e}"))
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut errors: Vec<FieldError> = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, list)| {
                let field = camel_case(&field);
                list.iter().map(move |e| FieldError {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", e.code)),
                    value: e.params.get("value").cloned(),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::Validation {
            message: VALIDATION_FAILED.to_string(),
            errors,
        }
    }
}

/// Request schemas are camelCase on the wire.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            // Full detail stays in the logs.
            tracing::error!(error = ?self, "Unhandled server error");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let errors = match &self {
            AppError::Validation { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };

        let envelope = ErrorEnvelope::new(status, self.public_message(), errors);
        let detail = ErrorDetail {
            envelope: envelope.clone(),
            stack: format!("{self:?}"),
        };

        let mut response = (status, Json(envelope)).into_response();
        response.extensions_mut().insert(detail);
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "Name too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::ExpiredCredential).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::UserNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::duplicate("email", "a@b.co").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Database("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Database("connection reset by peer".into());
        assert_eq!(err.public_message(), INTERNAL_SERVER_ERROR);

        let err = AppError::Internal(anyhow::anyhow!("secret path /etc/creds"));
        assert_eq!(err.public_message(), INTERNAL_SERVER_ERROR);

        let err = AppError::NotFound("Coupon not found".into());
        assert_eq!(err.public_message(), "Coupon not found");
    }

    #[test]
    fn test_duplicate_message_names_field() {
        let err = AppError::duplicate("email", "jane@example.com");
        assert_eq!(
            err.to_string(),
            "Duplicate field value: email = \"jane@example.com\". Please use another value."
        );
    }

    #[test]
    fn test_validation_errors_are_sorted_field_errors() {
        let sample = Sample {
            name: "J".into(),
            email: "nope".into(),
        };
        let err: AppError = sample.validate().unwrap_err().into();

        let AppError::Validation { message, errors } = err else {
            panic!("expected validation error");
        };
        assert_eq!(message, VALIDATION_FAILED);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[1].field, "name");
        assert_eq!(errors[1].message, "Name too short");
        assert_eq!(errors[1].value, Some(serde_json::json!("J")));
    }

    #[test]
    fn test_field_names_are_camel_case() {
        assert_eq!(camel_case("coupon_title"), "couponTitle");
        assert_eq!(camel_case("use_coupon_via"), "useCouponVia");
        assert_eq!(camel_case("email"), "email");
    }

    #[test]
    fn test_jwt_error_classification() {
        use jsonwebtoken::errors::{Error, ErrorKind};

        assert_eq!(
            AuthError::from(Error::from(ErrorKind::ExpiredSignature)),
            AuthError::ExpiredCredential
        );
        assert_eq!(
            AuthError::from(Error::from(ErrorKind::InvalidToken)),
            AuthError::MalformedCredential
        );
        assert_eq!(
            AuthError::from(Error::from(ErrorKind::InvalidSignature)),
            AuthError::InvalidCredential
        );
        assert_eq!(
            AuthError::from(Error::from(ErrorKind::InvalidAudience)),
            AuthError::InvalidCredential
        );
    }

    #[test]
    fn test_error_response_carries_detail_extension() {
        let response = AppError::Conflict("taken".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.envelope.message, "taken");
        assert!(detail.stack.contains("Conflict"));
    }
}
