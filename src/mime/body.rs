use regex::Regex;

use super::encoding::decode_transfer_encoding;
use super::parts::{
    extract_boundary, header_value, split_headers_content, split_parts, MimePart,
};

/// HTML and plain-text candidates gathered at one tree level. Each recursion
/// level returns its own pair; the caller merges explicitly, so no walk
/// mutates state owned by an enclosing level.
#[derive(Debug, Default)]
struct BodyCandidates {
    html: Option<String>,
    plain: Option<String>,
}

impl BodyCandidates {
    fn resolve(self) -> String {
        self.html.or(self.plain).unwrap_or_default()
    }
}

/// Resolves a raw message to its best display body: HTML when present, plain
/// text otherwise, empty string when neither exists.
pub fn select_body(raw: &str) -> String {
    let (headers, content) =
        split_headers_content(raw).unwrap_or_else(|| (raw.to_string(), String::new()));

    match extract_boundary(&headers) {
        Some(boundary) => walk_parts(&split_parts(&content, &boundary)).resolve(),
        None => {
            let encoding = header_value(&headers, "Content-Transfer-Encoding");
            decode_transfer_encoding(&content, encoding.as_deref())
                .trim()
                .to_string()
        }
    }
}

fn walk_parts(parts: &[MimePart]) -> BodyCandidates {
    let mut found = BodyCandidates::default();

    for part in parts {
        if let Some(boundary) = extract_boundary(&part.headers) {
            // A nested multipart (alternative inside mixed, related inside
            // alternative) resolves to one string; a `<` marks it as HTML
            // without re-deriving the nested Content-Type.
            let resolved = walk_parts(&split_parts(&part.content, &boundary)).resolve();
            if resolved.is_empty() {
                continue;
            }
            if resolved.contains('<') {
                if found.html.is_none() {
                    found.html = Some(resolved);
                }
            } else if found.plain.is_none() {
                found.plain = Some(resolved);
            }
            continue;
        }

        let content_type = header_value(&part.headers, "Content-Type")
            .unwrap_or_default()
            .to_ascii_lowercase();
        let decoded = || {
            let encoding = header_value(&part.headers, "Content-Transfer-Encoding");
            decode_transfer_encoding(&part.content, encoding.as_deref())
        };

        // First occurrence of each flavor at this level wins; later siblings
        // of the same flavor are ignored.
        if content_type.contains("text/html") {
            if found.html.is_none() {
                let text = decoded();
                if !text.is_empty() {
                    found.html = Some(text);
                }
            }
        } else if content_type.contains("text/plain") && found.plain.is_none() {
            let text = decoded();
            if !text.is_empty() {
                found.plain = Some(text);
            }
        }
    }

    found
}

/// Markup-stripped, whitespace-collapsed preview of a body, truncated to
/// `max_chars` characters. Used for list views over length-capped fetches.
pub fn snippet(body: &str, max_chars: usize) -> String {
    let tags = Regex::new(r"<[^>]*>").unwrap();
    let stripped = tags.replace_all(body, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_encoding::BASE64;

    #[test]
    fn alternative_prefers_html() {
        let raw = "Content-Type: multipart/alternative; boundary=XYZ\r\n\r\n--XYZ\r\nContent-Type: text/plain\r\n\r\nhello\r\n--XYZ\r\nContent-Type: text/html\r\n\r\n<b>hi</b>\r\n--XYZ--";
        assert_eq!(select_body(raw), "<b>hi</b>");
    }

    #[test]
    fn single_part_plain_text() {
        let raw = "Content-Type: text/plain\r\n\r\nhello world";
        assert_eq!(select_body(raw), "hello world");
    }

    #[test]
    fn single_part_is_trimmed() {
        let raw = "Content-Type: text/plain\r\n\r\n  hello world \r\n";
        assert_eq!(select_body(raw), "hello world");
    }

    #[test]
    fn plain_only_multipart_falls_back() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\nContent-Type: text/plain\r\n\r\njust text\r\n--b--";
        assert_eq!(select_body(raw), "just text");
    }

    #[test]
    fn first_plain_sibling_wins() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\nContent-Type: text/plain\r\n\r\nfirst\r\n--b\r\nContent-Type: text/plain\r\n\r\nsecond\r\n--b--";
        assert_eq!(select_body(raw), "first");
    }

    #[test]
    fn nested_alternative_inside_mixed() {
        let raw = "Content-Type: multipart/mixed; boundary=outer\r\n\r\n--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n--inner\r\nContent-Type: text/plain\r\n\r\nplain inner\r\n--inner\r\nContent-Type: text/html\r\n\r\n<p>html inner</p>\r\n--inner--\r\n--outer\r\nContent-Type: application/pdf; name=\"r.pdf\"\r\nContent-Disposition: attachment; filename=\"r.pdf\"\r\n\r\nJVBERi0=\r\n--outer--";
        assert_eq!(select_body(raw), "<p>html inner</p>");
    }

    #[test]
    fn nested_plain_resolution_without_markup() {
        let raw = "Content-Type: multipart/mixed; boundary=outer\r\n\r\n--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n--inner\r\nContent-Type: text/plain\r\n\r\nonly text here\r\n--inner--\r\n--outer--";
        assert_eq!(select_body(raw), "only text here");
    }

    #[test]
    fn base64_part_is_decoded() {
        let encoded = BASE64.encode("<h1>big</h1>".as_bytes());
        let raw = format!(
            "Content-Type: multipart/alternative; boundary=b\r\n\r\n--b\r\nContent-Type: text/html\r\nContent-Transfer-Encoding: base64\r\n\r\n{}\r\n--b--",
            encoded
        );
        assert_eq!(select_body(&raw), "<h1>big</h1>");
    }

    #[test]
    fn quoted_printable_part_is_decoded() {
        let raw = "Content-Type: multipart/alternative; boundary=b\r\n\r\n--b\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\ncaf=C3=A9 time=\r\n!\r\n--b--";
        assert_eq!(select_body(raw), "caf\u{e9} time!");
    }

    #[test]
    fn no_textual_part_resolves_empty() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\nContent-Type: image/png\r\nContent-Disposition: attachment; filename=\"x.png\"\r\n\r\niVBORw0=\r\n--b--";
        assert_eq!(select_body(raw), "");
    }

    #[test]
    fn snippet_strips_markup_and_collapses_whitespace() {
        let body = "<div><p>Hello   there</p>\r\n<a href=\"x\">world</a></div>";
        assert_eq!(snippet(body, 100), "Hello there world");
    }

    #[test]
    fn snippet_truncates_to_char_budget() {
        assert_eq!(snippet("one two three", 7), "one two");
    }
}
