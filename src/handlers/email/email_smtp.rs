use std::io::{Error as IoError, ErrorKind};

use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, Error, HttpResponse};
use futures_util::{StreamExt, TryStreamExt};
use lettre::message::{
    header::ContentType, Attachment, MultiPart, SinglePart,
};

use crate::{
    constants::SMTP_PORT,
    utils::{
        utils_session::check_is_valid_session,
        utils_transports::{create_smtp_transport, TransportCache},
    },
};

use super::models::EmailInDTO;

async fn send_email(
    mut payload: Multipart,
    session: Session,
    transports: web::Data<TransportCache>,
) -> Result<HttpResponse, Error> {
    let sess_values = check_is_valid_session(&session)?;

    let mut email_struct = EmailInDTO {
        to_address: String::new(),
        subject: String::new(),
        body: String::new(),
    };

    // Uploaded files are buffered in memory alongside the text fields; the
    // whole form is bounded by the multipart payload limit.
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        let file_name = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        let mut field_bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            field_bytes.extend_from_slice(&chunk?);
        }

        if let Some(file_name) = file_name {
            uploads.push((file_name, field_bytes));
            continue;
        }

        let value = String::from_utf8_lossy(&field_bytes).into_owned();
        match field_name.as_str() {
            "to_address" => email_struct.to_address = value,
            "subject" => email_struct.subject = value,
            "body" => email_struct.body = value,
            other => println!("Ignoring unknown form field: {}", other),
        }
    }

    let mut body_total = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .content_type(ContentType::TEXT_PLAIN)
            .body(email_struct.body.to_string()),
    );

    for (file_name, file_bytes) in uploads.into_iter() {
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string()
            .parse()
            .map_err(|err| send_error("Attachment content type rejected", err))?;

        body_total = body_total.singlepart(Attachment::new(file_name).body(file_bytes, content_type));
    }

    let to_address = email_struct
        .to_address
        .parse()
        .map_err(|err| send_error("Invalid recipient address", err))?;
    let from_address = sess_values
        .email
        .parse()
        .map_err(|err| send_error("Invalid sender address", err))?;

    let email = lettre::Message::builder()
        .to(to_address)
        .from(from_address)
        .subject(email_struct.subject.to_string())
        .multipart(body_total)
        .map_err(|err| send_error("Message assembly failed", err))?;

    let smtp_host = sess_values.smtp_host();
    let transport = transports
        .get_or_create(&smtp_host, SMTP_PORT, &sess_values.email, || {
            create_smtp_transport(
                &sess_values.email,
                &sess_values.password,
                &smtp_host,
                SMTP_PORT,
            )
        })
        .await?;

    transport.send(email).await?;

    Ok(HttpResponse::Ok().body("Ok"))
}

fn send_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::from(IoError::new(
        ErrorKind::Other,
        format!("{}: {}", context, err),
    ))
}

pub fn email_smtp_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/email/send").route(web::post().to(send_email)));
}
