use std::sync::Arc;

use axum::Extension;
use axum_extra::extract::cookie::CookieJar;
use hyper::StatusCode;

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;
use crate::setup::Config;
use crate::utils::cookies::{clear_refresh_cookie, REFRESH_COOKIE_NAME};
use crate::utils::extractors::DeviceFingerprint;
use crate::utils::token::AccessClaims;

#[axum::debug_handler]
pub async fn logout(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Extension(config): Extension<Arc<Config>>,
    claims: AccessClaims,
    DeviceFingerprint(device): DeviceFingerprint,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), ApiError<AuthError>> {
    // 1. The cookie must match the live session for this device
    let refresh_token = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::InvalidSession)?;

    // 2. Revoke the session
    engine.logout(&claims.sub, &device, &refresh_token).await?;

    // 3. Drop the cookie
    let jar = jar.add(clear_refresh_cookie(config.secure_cookies()));

    Ok((StatusCode::NO_CONTENT, jar))
}
