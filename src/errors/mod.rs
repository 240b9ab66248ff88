pub mod auth;
pub mod common;
pub mod response;

pub use auth::AuthError;
pub use common::CommonError;
pub use response::{ApiError, ErrorResponse};
