//! MIME helpers: mapping `mail-parser` output to the source model, HTML-to-text conversion.

use mail_parser::{Address, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::model::address::EmailAddress;
use crate::model::mail::{BodyPart, MimeType};

/// Flatten an address header (plain list or RFC 5322 groups) into mailboxes.
///
/// Entries without an address (e.g. an empty group) are dropped.
pub fn mailboxes(address: Option<&Address<'_>>) -> Vec<EmailAddress> {
    let addrs: Vec<&mail_parser::Addr<'_>> = match address {
        Some(Address::List(list)) => list.iter().collect(),
        Some(Address::Group(groups)) => groups.iter().flat_map(|g| g.addresses.iter()).collect(),
        None => Vec::new(),
    };

    addrs
        .into_iter()
        .filter_map(|addr| {
            let address = addr.address.as_deref()?.trim();
            if address.is_empty() {
                return None;
            }
            let name = addr.name.as_deref().unwrap_or("").trim();
            Some(EmailAddress::new(name, address))
        })
        .collect()
}

/// Convert one leaf part into a [`BodyPart`].
///
/// `raw` is the message the part was parsed from. Returns `None` for
/// multipart containers and embedded `message/rfc822` parts.
pub fn body_part(raw: &[u8], part: &MessagePart<'_>) -> Option<BodyPart> {
    if matches!(part.body, PartType::Multipart(_) | PartType::Message(_)) {
        return None;
    }

    let mime_type = part
        .content_type()
        .map(|ct| MimeType::new(ct.ctype(), ct.subtype().unwrap_or("")))
        .unwrap_or_default();

    let disposition = part.content_disposition().map(|d| d.ctype().to_string());

    // Text parts arrive charset-decoded; other text/* types are attachments
    // and keep their original bytes.
    let content = match &part.body {
        PartType::Text(_) | PartType::Html(_) if !mime_type.is_body_text() => {
            transfer_decoded(raw, part).unwrap_or_else(|| part.contents().to_vec())
        }
        _ => part.contents().to_vec(),
    };

    Some(BodyPart {
        mime_type,
        file_name: part.attachment_name().map(String::from),
        content_id: part.content_id().map(String::from),
        disposition,
        content,
    })
}

/// Body of `part` with only its Content-Transfer-Encoding removed.
fn transfer_decoded(raw: &[u8], part: &MessagePart<'_>) -> Option<Vec<u8>> {
    let body = raw.get(part.raw_body_offset()..part.raw_end_offset())?;
    let encoding = part.content_transfer_encoding().unwrap_or("7bit");

    // Re-parse the raw body as an opaque binary part
    let mut wrapped = format!(
        "Content-Type: application/octet-stream\r\nContent-Transfer-Encoding: {encoding}\r\n\r\n"
    )
    .into_bytes();
    wrapped.extend_from_slice(body);

    let parsed = MessageParser::default().parse(wrapped.as_slice())?;
    let content = parsed.parts.first()?.contents().to_vec();
    Some(content)
}

/// The first genuine `text/html` body among `ids`.
///
/// `mail-parser` lists a plain-text part under the HTML bodies when the
/// message has no HTML alternative; such parts are skipped here.
pub fn html_body(parts: &[MessagePart<'_>], ids: &[usize]) -> Option<String> {
    ids.iter().find_map(|&id| match &parts.get(id)?.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    })
}

/// The first genuine `text/plain` body among `ids`.
pub fn text_body(parts: &[MessagePart<'_>], ids: &[usize]) -> Option<String> {
    ids.iter().find_map(|&id| match &parts.get(id)?.body {
        PartType::Text(text) => Some(text.to_string()),
        _ => None,
    })
}

/// Strip one leading `<` and one trailing `>` from a Content-ID.
pub fn strip_angle_brackets(id: &str) -> &str {
    let id = id.strip_prefix('<').unwrap_or(id);
    id.strip_suffix('>').unwrap_or(id)
}

/// Skip a UTF-8 BOM and the `From ` separator line of an mbox-style export.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Convert HTML to plain text for the `PR_BODY` rendition.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>`
/// - Removes scripts and styles
/// - Decodes common HTML entities
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();

    text = remove_tag_block(&text, "script");
    text = remove_tag_block(&text, "style");
    text = remove_tag_block(&text, "head");

    for tag in &["br", "BR", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in &["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result = result.replace("&nbsp;", " ");
    result = result.replace("&#160;", " ");
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&#39;", "'");
    result = result.replace("&apos;", "'");
    result = result.replace("&amp;", "&");

    // Collapse runs of blank lines
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    // ASCII lowercasing keeps byte offsets aligned with `remaining`.
    while let Some(start) = find_tag(&remaining.to_ascii_lowercase(), &open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        if let Some(end) = after.to_ascii_lowercase().find(&close) {
            remaining = &after[end + close.len()..];
        } else {
            remaining = "";
            break;
        }
    }
    result.push_str(remaining);
    result
}

/// Find `<tag` followed by `>` or whitespace, so `<head` does not match `<header`.
fn find_tag(haystack: &str, open: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(open) {
        let start = from + pos;
        let next = haystack[start + open.len()..].chars().next();
        if matches!(next, Some('>') | Some('/')) || next.is_some_and(char::is_whitespace) {
            return Some(start);
        }
        from = start + open.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_angle_brackets() {
        assert_eq!(strip_angle_brackets("<abc123>"), "abc123");
        assert_eq!(strip_angle_brackets("abc123"), "abc123");
        assert_eq!(strip_angle_brackets("<abc123"), "abc123");
        assert_eq!(strip_angle_brackets("<<x>>"), "<x>");
    }

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_skip_bom() {
        let data = b"\xEF\xBB\xBFSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_skip_from_line_no_from() {
        let data = b"Subject: Test\n\nBody\n";
        assert_eq!(skip_from_line(data), data);
    }

    #[test]
    fn test_html_to_text_basic() {
        let html = "<p>Hello <b>world</b></p><p>Second paragraph</p>";
        let text = html_to_text(html);
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("Tom &amp; Jerry &lt;3&gt;"), "Tom & Jerry <3>");
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_html_to_text_removes_head_and_styles() {
        let html = "<html><head><title>T</title><style>p{color:red}</style></head>\
                    <body><header>Top</header>Body</body></html>";
        let text = html_to_text(html);
        assert!(!text.contains("color"));
        assert!(text.contains("Top"));
        assert!(text.contains("Body"));
    }
}
