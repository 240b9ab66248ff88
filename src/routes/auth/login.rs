use std::sync::Arc;

use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;
use crate::setup::Config;
use crate::utils::cookies::refresh_cookie;
use crate::utils::extractors::DeviceFingerprint;

use super::UserOutput;

#[derive(Debug, Deserialize, Validate)]
pub struct RoutePayload {
    #[validate(email)]
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutput {
    access_token: String,
    user: UserOutput,
}

#[axum::debug_handler]
pub async fn login(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Extension(config): Extension<Arc<Config>>,
    DeviceFingerprint(device): DeviceFingerprint,
    jar: CookieJar,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, CookieJar, Json<RouteOutput>), ApiError<AuthError>> {
    // 1. Validate payload input
    payload.validate()?;

    // 2. Authenticate and establish the device session
    let outcome = engine
        .login(&payload.email, &payload.password, &device)
        .await?;

    // 3. The refresh token travels only in the cookie
    let jar = jar.add(refresh_cookie(
        outcome.refresh_token,
        config.refresh_token_exp_days,
        config.secure_cookies(),
    ));

    Ok((
        StatusCode::OK,
        jar,
        Json(RouteOutput {
            access_token: outcome.access_token,
            user: UserOutput::from(outcome.user),
        }),
    ))
}
