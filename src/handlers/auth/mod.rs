pub mod auth;
pub mod models;
