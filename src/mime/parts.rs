use regex::Regex;

/// One MIME entity: its raw header block and its raw (still encoded) content.
///
/// Headers are kept as opaque text and scanned by pattern match; nothing here
/// builds a structured key/value map. A part whose headers carry a `boundary`
/// parameter is split further by the recursive walks in `body` and
/// `attachments`.
#[derive(Debug, Clone)]
pub struct MimePart {
    pub headers: String,
    pub content: String,
}

/// Splits a raw message into its top-level parts.
///
/// Without a `boundary` parameter in the top header block the whole source is
/// a single leaf; a source lacking even a blank-line separator is treated as
/// headers with empty content.
pub fn parse_message(raw: &str) -> Vec<MimePart> {
    let (headers, content) =
        split_headers_content(raw).unwrap_or_else(|| (raw.to_string(), String::new()));

    match extract_boundary(&headers) {
        Some(boundary) => split_parts(&content, &boundary),
        None => vec![MimePart { headers, content }],
    }
}

/// Splits a multipart body on the literal `--<boundary>` delimiter.
///
/// Segments that are empty, whitespace-only or the closing `--` marker are
/// discarded; segments without a blank-line separator are skipped as
/// malformed.
pub fn split_parts(body: &str, boundary: &str) -> Vec<MimePart> {
    let delimiter = format!("--{}", boundary);
    let mut parts = Vec::new();

    for segment in body.split(delimiter.as_str()) {
        let segment = segment.trim();
        if segment.is_empty() || segment.starts_with("--") {
            continue;
        }

        if let Some((headers, content)) = split_headers_content(segment) {
            parts.push(MimePart { headers, content });
        }
    }

    parts
}

/// Splits a segment at its first blank line (CRLF CRLF, or bare LF LF for
/// sloppy senders) into header block and content. `None` when the segment has
/// no blank line at all.
pub fn split_headers_content(segment: &str) -> Option<(String, String)> {
    let crlf = segment.find("\r\n\r\n").map(|index| (index, 4));
    let lf = segment.find("\n\n").map(|index| (index, 2));

    let (index, width) = match (crlf, lf) {
        (Some(first), Some(second)) => {
            if first.0 <= second.0 {
                first
            } else {
                second
            }
        }
        (Some(first), None) => first,
        (None, Some(second)) => second,
        (None, None) => return None,
    };

    Some((
        segment[..index].to_string(),
        segment[index + width..].to_string(),
    ))
}

/// Finds the `boundary=` token in a header block, quoted or bare, terminated
/// by `;`, CR or LF. Searches the whole block so folded Content-Type headers
/// still yield their boundary.
pub fn extract_boundary(header_text: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?i)boundary="?([^";\r\n]+)"?"#).unwrap();
    pattern
        .captures(header_text)
        .map(|captures| captures[1].to_string())
}

/// Case-insensitive lookup of a single header's value text within an opaque
/// header block. Folded continuation lines are not unfolded; callers that
/// need parameters from continuations (boundary, filename) scan the whole
/// block instead.
pub fn header_value(headers: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r"(?im)^{}[ \t]*:[ \t]*([^\r\n]+)", regex::escape(name))).unwrap();
    pattern
        .captures(headers)
        .map(|captures| captures[1].trim().to_string())
}
