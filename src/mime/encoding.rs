use data_encoding::BASE64;
use regex::bytes::{Captures, Regex};

/// Decodes one part's raw content per its declared Content-Transfer-Encoding.
///
/// Absent or unrecognized encodings pass the content through unchanged, and a
/// failed base64 decode falls back to the still-encoded original, so this
/// never errors to the caller.
pub fn decode_transfer_encoding(content: &str, encoding: Option<&str>) -> String {
    match encoding
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("base64") => decode_base64(content),
        Some("quoted-printable") => decode_quoted_printable(content),
        _ => content.to_string(),
    }
}

fn decode_base64(content: &str) -> String {
    let stripped: String = content.chars().filter(|c| !c.is_whitespace()).collect();

    match BASE64.decode(stripped.as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => content.to_string(),
        },
        Err(_) => content.to_string(),
    }
}

/// Soft line breaks (`=` directly before a line break) vanish first, then
/// each `=XX` hex escape becomes its raw byte, scanning left to right without
/// overlap. Escapes with invalid hex digits stay as written.
fn decode_quoted_printable(content: &str) -> String {
    let soft_breaks = Regex::new(r"=\r?\n").unwrap();
    let without_breaks = soft_breaks.replace_all(content.as_bytes(), &b""[..]);

    let hex_escapes = Regex::new(r"=([0-9A-Fa-f]{2})").unwrap();
    let decoded = hex_escapes.replace_all(&without_breaks, |captures: &Captures| {
        vec![hex_digit(captures[1][0]) * 16 + hex_digit(captures[1][1])]
    });

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_digit(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        _ => byte - b'A' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_name_is_case_insensitive() {
        let content = "aGVsbG8gd29ybGQ=";
        assert_eq!(
            decode_transfer_encoding(content, Some("BASE64")),
            decode_transfer_encoding(content, Some("base64"))
        );
    }

    #[test]
    fn base64_round_trip() {
        let original = "The quick brown fox jumps over the lazy dog";
        let encoded = BASE64.encode(original.as_bytes());
        assert_eq!(
            decode_transfer_encoding(&encoded, Some("base64")),
            original
        );
    }

    #[test]
    fn base64_embedded_whitespace_is_stripped() {
        assert_eq!(
            decode_transfer_encoding("aGVs\r\nbG8=", Some("base64")),
            "hello"
        );
    }

    #[test]
    fn base64_failure_returns_original() {
        let malformed = "!!!not base64!!!";
        assert_eq!(
            decode_transfer_encoding(malformed, Some("base64")),
            malformed
        );
    }

    #[test]
    fn quoted_printable_removes_soft_breaks() {
        assert_eq!(
            decode_transfer_encoding("abc=\r\ndef", Some("quoted-printable")),
            "abcdef"
        );
        assert_eq!(
            decode_transfer_encoding("abc=\ndef", Some("quoted-printable")),
            "abcdef"
        );
    }

    #[test]
    fn quoted_printable_decodes_hex_escapes() {
        assert_eq!(
            decode_transfer_encoding("caf=C3=A9", Some("quoted-printable")),
            "caf\u{e9}"
        );
    }

    #[test]
    fn quoted_printable_leaves_invalid_escape() {
        assert_eq!(
            decode_transfer_encoding("50=G1", Some("quoted-printable")),
            "50=G1"
        );
    }

    #[test]
    fn absent_encoding_passes_through() {
        assert_eq!(decode_transfer_encoding("as-is", None), "as-is");
    }

    #[test]
    fn unrecognized_encoding_passes_through() {
        assert_eq!(decode_transfer_encoding("as-is", Some("7bit")), "as-is");
    }
}
