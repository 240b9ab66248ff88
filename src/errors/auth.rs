use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::services::database::StoreError;
use crate::services::objects::ObjectError;
use crate::utils::token::TokenError;

use super::{response::ApiError, CommonError, ErrorResponse};

/// Every orchestrator operation reports failures through this one taxonomy.
/// Callers branch on the kind, never on message text.
#[derive(Debug, Display)]
pub enum AuthError {
    Common(CommonError),
    NotFound,
    AlreadyExists,
    InvalidCredentials,
    AccountNotVerified,
    AlreadyVerified,
    InvalidCode,
    CodeExpired,
    RateLimited,
    InvalidSession,
    MalformedRequest(String),
}

impl ErrorResponse for AuthError {
    fn error_name(&self) -> &str {
        match self {
            AuthError::Common(e) => e.error_name(),
            AuthError::NotFound => "Not Found",
            AuthError::AlreadyExists => "Already Exists",
            AuthError::InvalidCredentials => "Invalid Credentials",
            AuthError::AccountNotVerified => "Account Not Verified",
            AuthError::AlreadyVerified => "Already Verified",
            AuthError::InvalidCode => "Invalid Code",
            AuthError::CodeExpired => "Code Expired",
            AuthError::RateLimited => "Rate Limited",
            AuthError::InvalidSession => "Invalid Session",
            AuthError::MalformedRequest(_) => "Malformed Request",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            AuthError::Common(e) => e.error_message(),
            AuthError::NotFound => json!("No account exists for the provided email"),
            AuthError::AlreadyExists => json!("An account with this email already exists"),
            AuthError::InvalidCredentials => json!("The provided credentials are invalid"),
            AuthError::AccountNotVerified => json!("The account is not verified"),
            AuthError::AlreadyVerified => json!("The account is already verified"),
            AuthError::InvalidCode => json!("The provided code is invalid"),
            AuthError::CodeExpired => json!("The provided code has expired"),
            AuthError::RateLimited => json!("Too many codes requested today"),
            AuthError::InvalidSession => json!("The session is no longer valid"),
            AuthError::MalformedRequest(detail) => json!(detail),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Common(e) => e.status_code(),
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountNotVerified => StatusCode::FORBIDDEN,
            AuthError::AlreadyVerified => StatusCode::CONFLICT,
            AuthError::InvalidCode => StatusCode::BAD_REQUEST,
            AuthError::CodeExpired => StatusCode::UNAUTHORIZED,
            AuthError::RateLimited => StatusCode::FORBIDDEN,
            AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<CommonError> for AuthError {
    fn from(error: CommonError) -> Self {
        AuthError::Common(error)
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::AlreadyExists => AuthError::AlreadyExists,
            other => AuthError::Common(CommonError::Store(other)),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(error: argon2::password_hash::Error) -> Self {
        AuthError::Common(CommonError::Hashing(error))
    }
}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        AuthError::Common(CommonError::Token(error))
    }
}

impl From<ObjectError> for AuthError {
    fn from(error: ObjectError) -> Self {
        AuthError::Common(CommonError::Object(error))
    }
}

impl From<AuthError> for ApiError<AuthError> {
    fn from(error: AuthError) -> Self {
        ApiError(error)
    }
}

// Automatic Error Conversion

impl From<validator::ValidationErrors> for ApiError<AuthError> {
    fn from(error: validator::ValidationErrors) -> Self {
        ApiError(AuthError::Common(CommonError::Validation(error)))
    }
}
