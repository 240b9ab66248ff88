pub mod login;
pub mod logout;
pub mod logout_all;
pub mod password_reset;
pub mod password_reset_request;
pub mod refresh;
pub mod register;
pub mod resend_verification;
pub mod verify_account;

use axum::{routing::post, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::database::user::{Role, User};

pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register::register))
        .route("/verify-account", post(verify_account::verify_account))
        .route(
            "/resend-verification",
            post(resend_verification::resend_verification),
        )
        .route("/login", post(login::login))
        .route("/refresh", post(refresh::refresh))
        .route("/logout", post(logout::logout))
        .route("/logout-all", post(logout_all::logout_all))
        .route(
            "/password-reset",
            post(password_reset_request::password_reset_request),
        )
        .route("/password-reset/confirm", post(password_reset::password_reset))
}

/// Wire shape of a user. Notably absent: anything credential-related.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOutput {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserOutput {
    fn from(user: User) -> Self {
        UserOutput {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
            avatar_url: user.avatar_url,
            role: user.role,
            created_at: user.created_at,
        }
    }
}
