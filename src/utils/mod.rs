pub mod cookies;
pub mod crypto;
pub mod extractors;
pub mod random;
pub mod schemas;
pub mod token;
pub mod validation;
