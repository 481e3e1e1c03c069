use std::cmp::{max, min};

use actix_session::Session;
use actix_web::{
    http::header::{ContentDisposition, ContentEncoding, DispositionParam, DispositionType},
    web, Error, HttpResponse,
};
use data_encoding::BASE64;
use imap::types::{Fetch, Flag, NameAttribute};
use rustyknife::rfc2047::encoded_word;
use utf7_imap::{decode_utf7_imap, encode_utf7_imap};

use crate::{
    constants::{IMAP_PORT, PREVIEW_SOURCE_LIMIT_BYTES, SNIPPET_MAX_CHARS},
    mime::{
        attachments::collect_attachments,
        body::{select_body, snippet},
    },
    utils::{utils_session::check_is_valid_session, utils_transports::create_imap_session},
};

use super::models::{
    EmailAttachmentInDTO, EmailDeleteInDTO, EmailDetailAttachmentOutDTO, EmailDetailInDTO,
    EmailDetailOutDTO, EmailInspectOutDTO, EmailListInDTO, EmailListOutDTO, MailboxListOutDTO,
};

async fn get_email_in_detail_from_inbox(
    session: Session,
    request: web::Query<EmailDetailInDTO>,
) -> Result<EmailDetailOutDTO, Error> {
    let credentials = check_is_valid_session(&session)?;
    let mut imap_session = create_imap_session(
        &credentials.email,
        &credentials.password,
        &credentials.imap_host(),
        IMAP_PORT,
    )
    .await?;

    imap_session
        .select(encode_utf7_imap(request.mailbox_name.clone()))
        .map_err(|err| imap_error("IMAP select failed", err))?;

    let messages = imap_session
        .fetch(
            format!("{}", request.sequence_number),
            "(FLAGS RFC822 ENVELOPE INTERNALDATE)",
        )
        .map_err(|err| imap_error("IMAP fetch failed", err))?;

    let message = messages
        .first()
        .ok_or_else(|| imap_error("IMAP fetch failed", "message not found"))?;

    // Decoding is best-effort per message: a missing or mangled source
    // degrades to an empty body and attachment list, never to a 500.
    let raw_source = String::from_utf8_lossy(message.body().unwrap_or_default()).into_owned();
    let body = select_body(&raw_source);
    let attachments = collect_attachments(&raw_source)
        .into_iter()
        .map(|attachment| EmailDetailAttachmentOutDTO {
            filename: attachment.filename,
            mime_type: attachment.mime_type,
            size_bytes: attachment.size_bytes,
            payload_base64: attachment.payload_base64,
        })
        .collect();

    let (from_address, subject) = envelope_summary(message);
    let response = EmailDetailOutDTO {
        from_address,
        subject,
        was_read: message.flags().contains(&Flag::Seen),
        send_date: message.internal_date().map(|date| date.naive_utc()),
        body,
        attachments,
    };

    let _ = imap_session.logout();
    Ok(response)
}

async fn delete_email_from_inbox(
    session: Session,
    request: web::Json<EmailDeleteInDTO>,
) -> Result<HttpResponse, Error> {
    let credentials = check_is_valid_session(&session)?;
    let mut imap_session = create_imap_session(
        &credentials.email,
        &credentials.password,
        &credentials.imap_host(),
        IMAP_PORT,
    )
    .await?;

    imap_session
        .select(encode_utf7_imap(request.mailbox_name.clone()))
        .map_err(|err| imap_error("IMAP select failed", err))?;
    imap_session
        .store(
            format!(
                "{}:{}",
                request.sequence_set_top, request.sequence_set_bottom
            ),
            "+FLAGS (\\Deleted)",
        )
        .map_err(|err| imap_error("IMAP store failed", err))?;
    imap_session
        .expunge()
        .map_err(|err| imap_error("IMAP expunge failed", err))?;

    let _ = imap_session.logout();
    Ok(HttpResponse::Ok().body("Ok"))
}

async fn list_emails_from_inbox(
    session: Session,
    request: web::Query<EmailListInDTO>,
) -> Result<EmailListOutDTO, Error> {
    let credentials = check_is_valid_session(&session)?;
    let mut imap_session = create_imap_session(
        &credentials.email,
        &credentials.password,
        &credentials.imap_host(),
        IMAP_PORT,
    )
    .await?;

    let mailbox_info = imap_session
        .select(encode_utf7_imap(request.mailbox_name.clone()))
        .map_err(|err| imap_error("IMAP select failed", err))?;

    let start_number = mailbox_info.exists
        - min(
            mailbox_info.exists,
            request.requested_page_number * request.page_size,
        );

    if start_number == 0 {
        let _ = imap_session.logout();
        return Ok(EmailListOutDTO {
            total_emails_count: mailbox_info.exists,
            requested_page_number: request.requested_page_number,
            page_size: request.page_size,
            emails: vec![],
        });
    }

    let end_number = max(1, start_number - min(start_number, request.page_size + 1));

    let messages_raw = imap_session
        .fetch(
            format!("{}:{}", end_number, start_number),
            "(FLAGS ENVELOPE INTERNALDATE BODY.PEEK[])",
        )
        .map_err(|err| imap_error("IMAP fetch failed", err))?;

    let mut messages_out: Vec<EmailInspectOutDTO> = vec![];

    for message in messages_raw.iter() {
        let (from_address, subject) = envelope_summary(message);

        // Preview decoding runs over a length-capped slice of the source and
        // degrades to an empty snippet for anything it cannot make sense of.
        let snippet_text = message
            .body()
            .map(|raw| {
                let capped = &raw[..raw.len().min(PREVIEW_SOURCE_LIMIT_BYTES)];
                snippet(
                    &select_body(&String::from_utf8_lossy(capped)),
                    SNIPPET_MAX_CHARS,
                )
            })
            .unwrap_or_default();

        messages_out.push(EmailInspectOutDTO {
            from_address,
            subject,
            was_read: message.flags().contains(&Flag::Seen),
            send_date: message.internal_date().map(|date| date.naive_utc()),
            sequence_number: message.message,
            snippet: snippet_text,
        });
    }

    let response = EmailListOutDTO {
        total_emails_count: mailbox_info.exists,
        requested_page_number: request.requested_page_number,
        page_size: request.page_size,
        emails: messages_out,
    };

    let _ = imap_session.logout();
    Ok(response)
}

async fn download_attachment_from_email(
    session: Session,
    request: web::Query<EmailAttachmentInDTO>,
) -> Result<HttpResponse, Error> {
    let credentials = check_is_valid_session(&session)?;
    let mut imap_session = create_imap_session(
        &credentials.email,
        &credentials.password,
        &credentials.imap_host(),
        IMAP_PORT,
    )
    .await?;

    imap_session
        .select(encode_utf7_imap(request.mailbox_name.clone()))
        .map_err(|err| imap_error("IMAP select failed", err))?;

    let messages = imap_session
        .fetch(
            format!("{}", request.sequence_number),
            "(FLAGS RFC822 ENVELOPE INTERNALDATE)",
        )
        .map_err(|err| imap_error("IMAP fetch failed", err))?;

    let message = messages
        .first()
        .ok_or_else(|| imap_error("IMAP fetch failed", "message not found"))?;

    let raw_source = String::from_utf8_lossy(message.body().unwrap_or_default()).into_owned();
    let found_attachment = collect_attachments(&raw_source)
        .into_iter()
        .find(|attachment| attachment.filename == request.attachment_name);

    let _ = imap_session.logout();

    match found_attachment {
        Some(attachment) => {
            let decoded_bytes = match BASE64.decode(attachment.payload_base64.as_bytes()) {
                Ok(bytes) => bytes,
                Err(error) => {
                    println!("Attachment decoding error: {}", error);
                    vec![]
                }
            };

            let content_disposition = ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(attachment.filename.clone())],
            };

            Ok(HttpResponse::Ok()
                .insert_header(ContentEncoding::Identity)
                .insert_header(content_disposition)
                .content_type("application/octet-stream")
                .body(decoded_bytes))
        }
        None => Ok(HttpResponse::NotFound().body("404 Not Found")),
    }
}

async fn get_mailboxes(session: Session) -> Result<MailboxListOutDTO, Error> {
    let credentials = check_is_valid_session(&session)?;
    let mut imap_session = create_imap_session(
        &credentials.email,
        &credentials.password,
        &credentials.imap_host(),
        IMAP_PORT,
    )
    .await?;

    let mailboxes = imap_session
        .list(None, Some("*"))
        .map_err(|err| imap_error("IMAP list failed", err))?;

    let mut mailbox_names: Vec<String> = vec![];
    for mailbox in mailboxes.iter() {
        if !mailbox.attributes().contains(&NameAttribute::NoSelect) {
            mailbox_names.push(decode_utf7_imap(mailbox.name().to_string()));
        }
    }

    let _ = imap_session.logout();
    Ok(MailboxListOutDTO { mailbox_names })
}

/// Sender and subject out of the fetched envelope; RFC 2047 encoded-word
/// subjects are decoded, anything unparseable falls back to lossy UTF-8.
fn envelope_summary(message: &Fetch) -> (String, String) {
    let envelope = match message.envelope() {
        Some(envelope) => envelope,
        None => return (String::new(), String::new()),
    };

    let from_address = match envelope.from.as_ref().and_then(|senders| senders.first()) {
        Some(sender) => {
            let mailbox = String::from_utf8_lossy(sender.mailbox.unwrap_or_default());
            let host = String::from_utf8_lossy(sender.host.unwrap_or_default());
            format!("{}@{}", mailbox, host)
        }
        None => String::new(),
    };

    let subject_bytes = envelope.subject.unwrap_or_default();
    let (_, subject) = encoded_word(subject_bytes).unwrap_or((
        subject_bytes,
        String::from_utf8_lossy(subject_bytes).into_owned(),
    ));

    (from_address, subject)
}

fn imap_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::from(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, err),
    ))
}

pub fn email_imap_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/email")
            .route(web::get().to(list_emails_from_inbox))
            .route(web::delete().to(delete_email_from_inbox)),
    )
    .service(web::resource("/mailbox").route(web::get().to(get_mailboxes)))
    .service(web::resource("/emailDetail").route(web::get().to(get_email_in_detail_from_inbox)))
    .service(web::resource("/attachment").route(web::get().to(download_attachment_from_email)));
}
