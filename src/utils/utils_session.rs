use std::io::{Error, ErrorKind};

use actix_session::Session;

use crate::{
    constants::{AUTH_DOMAIN_STRING, AUTH_EMAIL_STRING, AUTH_PASSWORD_STRING},
    handlers::auth::models::SignInMessage,
};

/// Rebuilds the signed-in credentials from the cookie session, or fails with
/// an opaque unauthenticated error.
pub fn check_is_valid_session(session: &Session) -> Result<SignInMessage, Error> {
    let email = session.get::<String>(AUTH_EMAIL_STRING).ok().flatten();
    let password = session.get::<String>(AUTH_PASSWORD_STRING).ok().flatten();
    let domain = session.get::<String>(AUTH_DOMAIN_STRING).ok().flatten();

    match (email, password, domain) {
        (Some(email), Some(password), Some(domain)) => Ok(SignInMessage {
            email,
            password,
            domain,
        }),
        _ => Err(Error::new(ErrorKind::Other, "Unauthenticated")),
    }
}
