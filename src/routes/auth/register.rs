use std::sync::Arc;

use axum::{Extension, Json};
use data_encoding::BASE64;
use hyper::StatusCode;
use serde::Deserialize;
use validator::Validate;

use crate::errors::{ApiError, AuthError};
use crate::services::auth::{AuthEngine, AvatarUpload, NewRegistration};
use crate::utils::validation::{validate_password_strength, validate_phone_number};

use super::UserOutput;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarInput {
    data: String,
    content_type: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoutePayload {
    #[validate(length(min = 1))]
    first_name: String,
    #[validate(length(min = 1))]
    last_name: String,
    #[validate(email)]
    email: String,
    #[validate(custom(function = "validate_phone_number"))]
    phone_number: Option<String>,
    #[validate(custom(function = "validate_password_strength"))]
    password: String,
    avatar: Option<AvatarInput>,
}

#[axum::debug_handler]
pub async fn register(
    Extension(engine): Extension<Arc<AuthEngine>>,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, Json<UserOutput>), ApiError<AuthError>> {
    // 1. Validate payload input
    payload.validate()?;

    // 2. Decode the optional avatar
    let avatar = match payload.avatar {
        Some(input) => {
            let data = BASE64.decode(input.data.as_bytes()).map_err(|_| {
                AuthError::MalformedRequest(String::from("avatar data is not valid base64"))
            })?;
            Some(AvatarUpload {
                data,
                content_type: input.content_type,
            })
        }
        None => None,
    };

    // 3. Create the account and send the verification code
    let user = engine
        .register(
            NewRegistration {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
                phone_number: payload.phone_number,
                password: payload.password,
            },
            avatar,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserOutput::from(user))))
}
