use std::env;
use std::time::Duration as StdDuration;

use actix_cors::Cors;
use actix_session::{
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
    SessionMiddleware,
};
use actix_web::{
    cookie::{time::Duration, Key, SameSite},
    web, App, HttpResponse, HttpServer,
};
use dotenv::dotenv;

use constants::{AUTH_COOKIE_NAME, TRANSPORT_TTL_SECONDS};
use handlers::{
    auth::auth::auth_config,
    email::{email_imap::email_imap_config, email_smtp::email_smtp_config},
};
use utils::{auth_guards::AuthGuardFactory, utils_transports::TransportCache};

mod constants;
mod handlers;
mod mime;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let secret_key: Key = Key::derive_from(
        env::var("ENCRYPTION_KEY")
            .expect("ENCRYPTION_KEY must be set")
            .as_bytes(),
    );

    let port = match env::var("PORT") {
        Ok(number) => number.parse::<u16>()?,
        Err(_) => 8080,
    };

    // One process-wide cache of outbound SMTP transports, shared by workers.
    let transports = web::Data::new(TransportCache::new(StdDuration::from_secs(
        TRANSPORT_TTL_SECONDS,
    )));
    let app_transports = transports.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(app_transports.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_header()
                    .allowed_methods(vec!["GET", "POST", "DELETE"])
                    .supports_credentials()
                    .max_age(3600),
            )
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_secure(false)
                    .cookie_http_only(false)
                    .cookie_content_security(CookieContentSecurity::Signed)
                    .cookie_same_site(SameSite::Lax)
                    .session_lifecycle(PersistentSession::default().session_ttl(Duration::hours(2)))
                    .cookie_name(AUTH_COOKIE_NAME.to_string())
                    .build(),
            )
            .configure(app_config)
            .service(web::scope("/auth").configure(auth_config))
            .service(
                web::scope("/api")
                    .configure(email_smtp_config)
                    .configure(email_imap_config)
                    .wrap(AuthGuardFactory),
            )
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await?;

    transports.shutdown_all().await;

    Ok(())
}

fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health").route(web::get().to(|| async { HttpResponse::Ok().body("ok") })),
    );
}
