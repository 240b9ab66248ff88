use std::sync::Arc;

use axum::Extension;
use axum_extra::extract::cookie::CookieJar;
use hyper::StatusCode;

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;
use crate::setup::Config;
use crate::utils::cookies::clear_refresh_cookie;
use crate::utils::token::AccessClaims;

#[axum::debug_handler]
pub async fn logout_all(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Extension(config): Extension<Arc<Config>>,
    claims: AccessClaims,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), ApiError<AuthError>> {
    // 1. Revoke every session for the authenticated user
    engine.logout_all(&claims.sub).await?;

    // 2. Drop this device's cookie; other devices die on their next refresh
    let jar = jar.add(clear_refresh_cookie(config.secure_cookies()));

    Ok((StatusCode::NO_CONTENT, jar))
}
