use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;
use crate::utils::token::AccessClaims;

/// Pulls and verifies the `Authorization: Bearer` access token. Handlers
/// that take this extractor are authenticated by construction.
#[async_trait]
impl<S> FromRequestParts<S> for AccessClaims
where
    S: Send + Sync,
{
    type Rejection = ApiError<AuthError>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let engine = parts
            .extensions
            .get::<Arc<AuthEngine>>()
            .ok_or_else(|| {
                ApiError(AuthError::Common(crate::errors::CommonError::Other(
                    String::from("auth engine extension missing"),
                )))
            })?;

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError(AuthError::InvalidSession))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError(AuthError::InvalidSession))?;

        engine
            .parse_access_token(token)
            .map_err(|_| ApiError(AuthError::InvalidSession))
    }
}

/// Device identity for session scoping. The User-Agent string stands in for
/// a richer fingerprint; a client without one gets a 400.
pub struct DeviceFingerprint(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for DeviceFingerprint
where
    S: Send + Sync,
{
    type Rejection = ApiError<AuthError>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| DeviceFingerprint(value.to_string()))
            .ok_or_else(|| {
                ApiError(AuthError::MalformedRequest(String::from(
                    "User-Agent header is required",
                )))
            })
    }
}
