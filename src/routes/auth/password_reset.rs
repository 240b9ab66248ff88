use std::sync::Arc;

use axum::{Extension, Json};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ApiError, AuthError};
use crate::services::auth::AuthEngine;
use crate::utils::validation::{
    validate_otp_format, validate_otp_length, validate_password_strength,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoutePayload {
    #[validate(email)]
    email: String,
    #[validate(custom(function = "validate_otp_length"))]
    #[validate(custom(function = "validate_otp_format"))]
    code: String,
    #[validate(custom(function = "validate_password_strength"))]
    new_password: String,
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    message: String,
}

#[axum::debug_handler]
pub async fn password_reset(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, Json<RouteOutput>), ApiError<AuthError>> {
    // 1. Validate payload input
    payload.validate()?;

    // 2. Consume the code and rotate the credential
    engine
        .confirm_password_reset(&payload.email, &payload.code, &payload.new_password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(RouteOutput {
            message: String::from("Password reset successfully!"),
        }),
    ))
}
