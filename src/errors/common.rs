use derive_more::Display;

use crate::services::database::StoreError;
use crate::services::email::NotifyError;
use crate::services::objects::ObjectError;
use crate::utils::token::TokenError;

/// Infrastructure faults shared by every operation. The caller-facing
/// taxonomy lives in [`super::AuthError`]; these are the causes behind its
/// internal kind.
#[derive(Debug, Display)]
pub enum CommonError {
    Validation(validator::ValidationErrors),
    Store(StoreError),
    Email(NotifyError),
    Hashing(argon2::password_hash::Error),
    Token(TokenError),
    Object(ObjectError),
    Other(String),
}
