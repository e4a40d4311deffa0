// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation: extractors that decode then validate, plus the
//! field rules shared by request schemas.

use crate::error::AppError;
use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// JSON body that has passed `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string that has passed `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}

/// Deserialize an optional string, trimming it; blank becomes `None`.
pub fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Deserialize a list of strings, trimming entries and dropping blanks.
pub fn trimmed_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Letters and spaces only.
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        Ok(())
    } else {
        Err(rule_error(
            "name_charset",
            "Name must contain only alphabetic characters and spaces",
        ))
    }
}

/// Indian mobile number: 10 digits starting 6-9, optionally prefixed `+91`.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_indian_phone(phone) {
        Ok(())
    } else {
        Err(rule_error(
            "phone_format",
            "Invalid Indian phone number format. Use 10 digits starting with 6-9 or +91 followed by 10 digits",
        ))
    }
}

fn is_valid_indian_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| *c != ' ' && *c != '-').collect();
    let digits = compact.strip_prefix("+91").unwrap_or(&compact);

    digits.len() == 10
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(digits.as_bytes().first(), Some(b'6'..=b'9'))
}

/// Absolute http(s) URL.
pub fn validate_http_url(raw: &str) -> Result<(), ValidationError> {
    match reqwest::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(rule_error("url", "Must be a valid http(s) URL")),
    }
}

/// RFC3339 timestamp or `YYYY-MM-DD`.
pub fn validate_date(raw: &str) -> Result<(), ValidationError> {
    crate::time_utils::parse_flexible_date(raw)
        .map(|_| ())
        .ok_or_else(|| rule_error("date", "Must be an RFC3339 timestamp or YYYY-MM-DD date"))
}

/// `online`, `store` or `both`.
pub fn validate_usage_channel(raw: &str) -> Result<(), ValidationError> {
    crate::models::UsageChannel::parse(raw)
        .map(|_| ())
        .ok_or_else(|| rule_error("channel", "Must be one of: online, store, both"))
}

/// `active` or `expired`.
pub fn validate_status(raw: &str) -> Result<(), ValidationError> {
    crate::models::CouponStatus::parse(raw)
        .map(|_| ())
        .ok_or_else(|| rule_error("status", "Must be one of: active, expired"))
}
