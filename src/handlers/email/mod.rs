pub mod email_imap;
pub mod email_smtp;
pub mod models;
mod models_responders;
