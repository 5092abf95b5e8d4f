//! Loader for individual `.eml` files (RFC 5322 messages).

use std::path::Path;

use chrono::DateTime;
use mail_parser::{Message, MessageParser};

use crate::error::{ConvertError, Result};
use crate::model::mail::SourceMessage;
use crate::parser::mime;

/// Read and decode a single `.eml` file into a [`SourceMessage`].
///
/// The whole file is read and parsed before this returns.
pub fn load_eml(path: impl AsRef<Path>) -> Result<SourceMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvertError::FileNotFound(path.to_path_buf())
        } else {
            ConvertError::io(path, e)
        }
    })?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "Read source message");

    parse_eml(&data).ok_or_else(|| ConvertError::Parse(path.to_path_buf()))
}

/// Decode raw message bytes. Returns `None` if there is no message to parse.
pub fn parse_eml(data: &[u8]) -> Option<SourceMessage> {
    let message_bytes = mime::skip_from_line(data);
    if message_bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let parsed = MessageParser::default().parse(message_bytes)?;
    Some(from_parsed(&parsed, message_bytes))
}

/// Map a parsed `mail-parser` message onto the source model.
///
/// `raw` must be the bytes `msg` was parsed from.
pub fn from_parsed(msg: &Message<'_>, raw: &[u8]) -> SourceMessage {
    let parts: Vec<_> = msg
        .parts
        .iter()
        .filter_map(|part| mime::body_part(raw, part))
        .collect();

    let date = msg
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

    let source = SourceMessage {
        from: mime::mailboxes(msg.from()),
        to: mime::mailboxes(msg.to()),
        cc: mime::mailboxes(msg.cc()),
        bcc: mime::mailboxes(msg.bcc()),
        subject: msg.subject().map(String::from),
        date,
        html_body: mime::html_body(&msg.parts, &msg.html_body),
        text_body: mime::text_body(&msg.parts, &msg.text_body),
        parts,
    };

    tracing::debug!(
        from = source.from.len(),
        parts = source.parts.len(),
        has_html = source.html_body.is_some(),
        "Parsed source message"
    );

    source
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEWSLETTER: &str = concat!(
        "From: Acme News <news@acme.example>\r\n",
        "To: Bob <bob@example.com>, carol@example.com\r\n",
        "Subject: =?UTF-8?Q?Caf=C3=A9_weekly?=\r\n",
        "Date: Mon, 08 Jan 2024 10:00:00 +0000\r\n",
        "Message-ID: <msg001@acme.example>\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/related; boundary=\"rel\"\r\n",
        "\r\n",
        "--rel\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<html><body><img src=\"cid:img1\"></body></html>\r\n",
        "--rel\r\n",
        "Content-Type: image/png; name=\"logo.png\"\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "Content-ID: <img1>\r\n",
        "Content-Disposition: inline; filename=\"logo.png\"\r\n",
        "\r\n",
        "iVBORw0KGgo=\r\n",
        "--rel--\r\n",
    );

    #[test]
    fn test_parse_headers() {
        let msg = parse_eml(NEWSLETTER.as_bytes()).unwrap();
        assert_eq!(msg.from.len(), 1);
        assert_eq!(msg.from[0].address, "news@acme.example");
        assert_eq!(msg.from[0].display_name, "Acme News");
        assert_eq!(msg.to.len(), 2);
        assert_eq!(msg.to[1].address, "carol@example.com");
        assert_eq!(msg.subject.as_deref(), Some("Café weekly"));
        assert_eq!(msg.date.unwrap().timestamp(), 1_704_708_000);
    }

    #[test]
    fn test_parse_body_and_parts() {
        let msg = parse_eml(NEWSLETTER.as_bytes()).unwrap();
        assert!(msg.html_body.unwrap().contains("cid:img1"));
        assert!(msg.text_body.is_none());

        // multipart container is not a body part
        assert_eq!(msg.parts.len(), 2);
        assert!(msg.parts[0].mime_type.is("text", "html"));

        let image = &msg.parts[1];
        assert!(image.mime_type.is("image", "png"));
        assert_eq!(image.file_name.as_deref(), Some("logo.png"));
        assert_eq!(image.disposition.as_deref(), Some("inline"));
        assert_eq!(mime::strip_angle_brackets(image.content_id.as_deref().unwrap()), "img1");
        assert_eq!(image.content, b"\x89PNG\r\n\x1a\n");
    }

    fn csv_attachment(headers: &str, body: &str) -> String {
        format!(
            "From: a@b.com\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"b\"\r\n\
             \r\n\
             --b\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             See attached.\r\n\
             --b\r\n\
             {headers}\
             Content-Disposition: attachment; filename=\"data.csv\"\r\n\
             \r\n\
             {body}\r\n\
             --b--\r\n"
        )
    }

    #[test]
    fn test_text_attachment_keeps_original_bytes() {
        let raw = csv_attachment(
            "Content-Type: text/csv\r\nContent-Transfer-Encoding: base64\r\n",
            "Y2Fm6TsxCg==",
        );
        let msg = parse_eml(raw.as_bytes()).unwrap();
        let csv = msg.parts.iter().find(|p| p.mime_type.is("text", "csv")).unwrap();
        assert_eq!(csv.content, b"caf\xE9;1\n");
    }

    #[test]
    fn test_text_attachment_is_not_transcoded() {
        let raw = csv_attachment(
            "Content-Type: text/csv; charset=windows-1252\r\n\
             Content-Transfer-Encoding: base64\r\n",
            "Y2Fm6TsxCg==",
        );
        let msg = parse_eml(raw.as_bytes()).unwrap();
        let csv = msg.parts.iter().find(|p| p.mime_type.is("text", "csv")).unwrap();
        assert_eq!(csv.content, b"caf\xE9;1\n");

        let raw = csv_attachment(
            "Content-Type: text/csv; charset=windows-1252\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n",
            "caf=E9;1",
        );
        let msg = parse_eml(raw.as_bytes()).unwrap();
        let csv = msg.parts.iter().find(|p| p.mime_type.is("text", "csv")).unwrap();
        assert!(csv.content.starts_with(b"caf\xE9;1"));
    }

    #[test]
    fn test_plain_text_message_has_no_html_body() {
        let raw = b"From: a@b.com\r\nSubject: Hi\r\n\r\nJust text.\r\n";
        let msg = parse_eml(raw).unwrap();
        assert!(msg.html_body.is_none());
        assert_eq!(msg.text_body.as_deref().map(str::trim), Some("Just text."));
        assert_eq!(msg.parts.len(), 1);
        assert!(msg.parts[0].mime_type.is("text", "plain"));
    }

    #[test]
    fn test_missing_headers() {
        let raw = b"X-Mailer: test\r\n\r\n<p>hi</p>\r\n";
        let msg = parse_eml(raw).unwrap();
        assert!(msg.from.is_empty());
        assert!(msg.subject.is_none());
    }

    #[test]
    fn test_empty_input_is_not_a_message() {
        assert!(parse_eml(b"").is_none());
        assert!(parse_eml(b"\r\n\r\n").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_eml("/definitely/not/here.eml").unwrap_err();
        assert!(err.is_not_found());
    }
}
