use std::sync::Arc;

use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;
use crate::setup::Config;
use crate::utils::cookies::{refresh_cookie, REFRESH_COOKIE_NAME};
use crate::utils::extractors::DeviceFingerprint;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePayload {
    user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutput {
    access_token: String,
}

#[axum::debug_handler]
pub async fn refresh(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Extension(config): Extension<Arc<Config>>,
    DeviceFingerprint(device): DeviceFingerprint,
    jar: CookieJar,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, CookieJar, Json<RouteOutput>), ApiError<AuthError>> {
    // 1. The current refresh token comes from the cookie, never the body
    let refresh_token = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::InvalidSession)?;

    // 2. Validate and rotate
    let pair = engine
        .refresh(&payload.user_id, &device, &refresh_token)
        .await?;

    // 3. Swap the cookie for the rotated token
    let jar = jar.add(refresh_cookie(
        pair.refresh_token,
        config.refresh_token_exp_days,
        config.secure_cookies(),
    ));

    Ok((
        StatusCode::OK,
        jar,
        Json(RouteOutput {
            access_token: pair.access_token,
        }),
    ))
}
