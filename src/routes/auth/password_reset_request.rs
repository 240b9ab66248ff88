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
pub async fn password_reset_request(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, Json<RouteOutput>), ApiError<AuthError>> {
    // 1. Validate payload input
    payload.validate()?;

    // 2. Issue and send a reset code
    engine.request_password_reset(&payload.email).await?;

    Ok((
        StatusCode::OK,
        Json(RouteOutput {
            message: String::from("Password reset code sent!"),
        }),
    ))
}
