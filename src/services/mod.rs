pub mod auth;
pub mod database;
pub mod email;
pub mod objects;
