use data_encoding::BASE64;
use regex::Regex;
use serde::Serialize;

use super::parts::{extract_boundary, header_value, parse_message, split_parts, MimePart};

/// One extracted attachment. The payload stays base64: parts that arrived as
/// base64 keep their original text byte-for-byte (whitespace stripped), other
/// parts are re-encoded from their raw content bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedAttachment {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub payload_base64: String,
}

/// Walks a raw message and returns every part classified as an attachment,
/// outer parts first, nested parts in encounter order.
pub fn collect_attachments(raw: &str) -> Vec<ExtractedAttachment> {
    walk_parts(&parse_message(raw))
}

fn walk_parts(parts: &[MimePart]) -> Vec<ExtractedAttachment> {
    let mut found = Vec::new();

    for part in parts {
        if let Some(boundary) = extract_boundary(&part.headers) {
            found.extend(walk_parts(&split_parts(&part.content, &boundary)));
            continue;
        }

        if is_attachment(&part.headers) {
            found.push(build_attachment(part));
        }
    }

    found
}

/// Best-effort classification, not a protocol-correct decision. Inline parts
/// carrying a filename (typically embedded images) are captured on purpose.
fn is_attachment(headers: &str) -> bool {
    let disposition = header_value(headers, "Content-Disposition")
        .unwrap_or_default()
        .to_ascii_lowercase();
    let content_type = header_value(headers, "Content-Type")
        .unwrap_or_default()
        .to_ascii_lowercase();
    let has_filename = filename_token(headers).is_some();

    disposition.contains("attachment")
        || (has_filename
            && !content_type.contains("text/plain")
            && !content_type.contains("text/html"))
        || (disposition.contains("inline") && has_filename)
}

/// First `filename="..."` or `filename=...` match anywhere in the header
/// block, value kept in its original case.
fn filename_token(headers: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?i)filename="?([^";\r\n]+)"?"#).unwrap();
    pattern
        .captures(headers)
        .map(|captures| captures[1].to_string())
}

fn build_attachment(part: &MimePart) -> ExtractedAttachment {
    let filename =
        filename_token(&part.headers).unwrap_or_else(|| "attachment".to_string());

    let mime_type = header_value(&part.headers, "Content-Type")
        .map(|value| value.split(';').next().unwrap_or("").trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let encoding = header_value(&part.headers, "Content-Transfer-Encoding")
        .map(|value| value.trim().to_ascii_lowercase());

    let payload_base64: String = if encoding.as_deref() == Some("base64") {
        part.content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    } else {
        BASE64.encode(part.content.as_bytes())
    };

    // Declared size is derived from the base64 text alone; padding makes it
    // overstate the true byte count by up to 2.
    let size_bytes = (payload_base64.len() * 3 + 3) / 4;

    ExtractedAttachment {
        filename,
        mime_type,
        size_bytes,
        payload_base64,
    }
}
