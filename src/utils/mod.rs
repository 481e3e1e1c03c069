pub mod auth_guards;
pub mod utils_session;
pub mod utils_transports;
