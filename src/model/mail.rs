//! Source message types, as decoded from an `.eml` file.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;

/// A fully decoded source message.
///
/// Built once from the input file before any conversion starts; nothing
/// in it borrows from the raw bytes.
#[derive(Debug, Clone, Default)]
pub struct SourceMessage {
    /// Mailboxes from the `From:` header, in header order.
    pub from: Vec<EmailAddress>,

    /// Primary recipients (`To:`).
    pub to: Vec<EmailAddress>,

    /// Carbon-copy recipients (`Cc:`).
    pub cc: Vec<EmailAddress>,

    /// Blind carbon-copy recipients (`Bcc:`).
    pub bcc: Vec<EmailAddress>,

    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: Option<String>,

    /// Parsed `Date:` header.
    pub date: Option<DateTime<Utc>>,

    /// The first `text/html` body, if the message has one.
    pub html_body: Option<String>,

    /// The first `text/plain` body, if the message has one.
    pub text_body: Option<String>,

    /// Every leaf MIME part, in document order.
    pub parts: Vec<BodyPart>,
}

/// A MIME `type/subtype` pair, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub ctype: String,
    pub subtype: String,
}

impl MimeType {
    pub fn new(ctype: &str, subtype: &str) -> Self {
        Self {
            ctype: ctype.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
        }
    }

    /// Case-insensitive comparison against a `type`/`subtype` pair.
    pub fn is(&self, ctype: &str, subtype: &str) -> bool {
        self.ctype.eq_ignore_ascii_case(ctype) && self.subtype.eq_ignore_ascii_case(subtype)
    }

    /// `text/plain` and `text/html` parts carry the message body, never an attachment.
    pub fn is_body_text(&self) -> bool {
        self.is("text", "plain") || self.is("text", "html")
    }
}

impl Default for MimeType {
    /// RFC 2045 §5.2: a part without `Content-Type` is `text/plain`.
    fn default() -> Self {
        Self::new("text", "plain")
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ctype, self.subtype)
    }
}

/// One leaf MIME part of the source message.
#[derive(Debug, Clone, Default)]
pub struct BodyPart {
    pub mime_type: MimeType,

    /// File name from `Content-Disposition: filename=` or `Content-Type: name=`.
    pub file_name: Option<String>,

    /// Raw `Content-ID` value; may still carry angle brackets.
    pub content_id: Option<String>,

    /// Disposition type (`inline`, `attachment`, ...) if the header is present.
    pub disposition: Option<String>,

    /// Content with the transfer encoding already removed.
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_is_case_insensitive() {
        let mt = MimeType::new("Text", "HTML");
        assert!(mt.is("text", "html"));
        assert!(mt.is_body_text());
        assert_eq!(mt.to_string(), "text/html");
    }

    #[test]
    fn test_default_mime_type_is_plain_text() {
        assert!(MimeType::default().is("text", "plain"));
    }

    #[test]
    fn test_other_text_is_not_body_text() {
        assert!(!MimeType::new("text", "csv").is_body_text());
        assert!(!MimeType::new("image", "png").is_body_text());
    }
}
