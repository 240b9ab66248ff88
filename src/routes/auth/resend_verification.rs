use std::sync::Arc;

use axum::{Extension, Json};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;

#[derive(Debug, Deserialize, Validate)]
pub struct RoutePayload {
    #[validate(email)]
    email: String,
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    message: String,
}

#[axum::debug_handler]
pub async fn resend_verification(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, Json<RouteOutput>), ApiError<AuthError>> {
    // 1. Validate payload input
    payload.validate()?;

    // 2. Issue and send a fresh code
    engine.resend_verification(&payload.email).await?;

    Ok((
        StatusCode::OK,
        Json(RouteOutput {
            message: String::from("Verification code sent!"),
        }),
    ))
}
