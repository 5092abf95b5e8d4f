//! HTML-in-RTF encapsulation and the `PR_RTF_COMPRESSED` container.
//!
//! The HTML is kept recoverable: every tag goes into a `{\*\htmltag0 …}`
//! destination, text between tags becomes RTF text. Content of `<head>`,
//! `<style>` and `<script>` is wrapped as well so RTF-only readers skip it.

use std::fmt::Write as _;
use std::io;

use byteorder::{LittleEndian, WriteBytesExt};

use super::property::size_u32;

const RTF_HEADER: &str = "{\\rtf1\\ansi\\ansicpg1252\\fromhtml1 \\deff0\
{\\fonttbl{\\f0\\fswiss\\fcharset0 Arial;}}\r\n\\uc1\\pard\\plain\\f0\\fs20 ";

/// `COMPTYPE` of an uncompressed RTF container ("MELA").
const COMPTYPE_UNCOMPRESSED: u32 = 0x414C_454D;

/// Elements whose text is not part of the rendered body.
const HIDDEN_ELEMENTS: [&str; 3] = ["head", "style", "script"];

/// Encapsulate an HTML document in RTF.
pub fn encapsulate_html(html: &str) -> String {
    let mut out = String::with_capacity(RTF_HEADER.len() + html.len() * 2);
    out.push_str(RTF_HEADER);

    let mut hidden_depth = 0usize;
    let mut rest = html;
    while !rest.is_empty() {
        if rest.starts_with('<') {
            let end = markup_end(rest);
            let markup = &rest[..end];
            push_htmltag(&mut out, markup);

            if let Some((name, closing)) = element_name(markup) {
                if HIDDEN_ELEMENTS.contains(&name.as_str()) && !markup.ends_with("/>") {
                    if closing {
                        hidden_depth = hidden_depth.saturating_sub(1);
                    } else {
                        hidden_depth += 1;
                    }
                }
            }
            rest = &rest[end..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            if hidden_depth > 0 {
                push_htmltag(&mut out, text);
            } else {
                push_text(&mut out, text);
            }
            rest = &rest[end..];
        }
    }

    out.push('}');
    out
}

/// Wrap RTF bytes in the uncompressed `PR_RTF_COMPRESSED` form.
///
/// Header: `COMPSIZE` (bytes after this field), `RAWSIZE`, `COMPTYPE`, CRC
/// (zero for uncompressed data).
pub fn wrap_uncompressed(rtf: &[u8]) -> io::Result<Vec<u8>> {
    let raw_size = size_u32(rtf.len())?;
    let comp_size = raw_size.checked_add(12).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "RTF body too large")
    })?;

    let mut out = Vec::with_capacity(rtf.len() + 16);
    out.write_u32::<LittleEndian>(comp_size)?;
    out.write_u32::<LittleEndian>(raw_size)?;
    out.write_u32::<LittleEndian>(COMPTYPE_UNCOMPRESSED)?;
    out.write_u32::<LittleEndian>(0)?;
    out.extend_from_slice(rtf);
    Ok(out)
}

fn push_htmltag(out: &mut String, content: &str) {
    out.push_str("{\\*\\htmltag0 ");
    escape_into(out, content);
    out.push('}');
}

/// Append text found between tags.
///
/// Character references are kept as HTML in an `htmltag` destination; their
/// decoded character is written under `\htmlrtf` for RTF-only readers.
fn push_text(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        escape_into(out, &rest[..amp]);
        let candidate = &rest[amp..];
        match entity_at(candidate) {
            Some((len, ch)) => {
                push_htmltag(out, &candidate[..len]);
                out.push_str("\\htmlrtf ");
                let mut buf = [0u8; 4];
                escape_into(out, ch.encode_utf8(&mut buf));
                out.push_str("\\htmlrtf0 ");
                rest = &candidate[len..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    escape_into(out, rest);
}

/// Parse a character reference (`&amp;`, `&#233;`, `&#xE9;`) at the start of `s`.
///
/// Returns its byte length and the character it stands for.
fn entity_at(s: &str) -> Option<(usize, char)> {
    let body = s.strip_prefix('&')?;
    let end = body.find(';').filter(|&i| i > 0 && i <= 10)?;
    let name = &body[..end];

    let ch = if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        char::from_u32(code)?
    } else {
        named_entity(name)?
    };
    Some((end + 2, ch))
}

fn named_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "euro" => '\u{20ac}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "middot" => '\u{b7}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        _ => return None,
    };
    Some(ch)
}

/// Byte length of the tag or comment at the start of `s`.
fn markup_end(s: &str) -> usize {
    if s.starts_with("<!--") {
        return s.find("-->").map(|i| i + 3).unwrap_or(s.len());
    }
    s.find('>').map(|i| i + 1).unwrap_or(s.len())
}

/// Lowercase element name of a tag, and whether it is a closing tag.
fn element_name(markup: &str) -> Option<(String, bool)> {
    let inner = markup.strip_prefix('<')?;
    let (inner, closing) = match inner.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let name: String = inner
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        None
    } else {
        Some((name.to_ascii_lowercase(), closing))
    }
}

/// Append `text` as RTF text.
///
/// Non-ASCII characters use `\'hh` when Windows-1252 has them, `\uN?` otherwise.
fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\par\r\n"),
            '\r' => {}
            '\t' => out.push_str("\\tab "),
            ' '..='~' => out.push(ch),
            c if c.is_ascii_control() => {}
            c => push_non_ascii(out, c),
        }
    }
}

fn push_non_ascii(out: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
    if !had_errors && bytes.len() == 1 {
        let _ = write!(out, "\\'{:02x}", bytes[0]);
        return;
    }

    let mut units = [0u16; 2];
    for unit in ch.encode_utf16(&mut units) {
        // RTF control word parameters are signed 16-bit.
        let _ = write!(out, "\\u{}?", *unit as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(rtf: &str) -> &str {
        rtf.strip_prefix(RTF_HEADER)
            .and_then(|s| s.strip_suffix('}'))
            .expect("header and closing brace")
    }

    #[test]
    fn test_header_declares_fromhtml() {
        let rtf = encapsulate_html("");
        assert!(rtf.starts_with("{\\rtf1\\ansi\\ansicpg1252\\fromhtml1 "));
        assert!(rtf.ends_with('}'));
    }

    #[test]
    fn test_tags_and_text() {
        let rtf = encapsulate_html("<p>Hello <b>you</b></p>");
        assert_eq!(
            body(&rtf),
            "{\\*\\htmltag0 <p>}Hello {\\*\\htmltag0 <b>}you{\\*\\htmltag0 </b>}{\\*\\htmltag0 </p>}"
        );
    }

    #[test]
    fn test_escapes_rtf_specials() {
        let rtf = encapsulate_html("a{b}\\c");
        assert_eq!(body(&rtf), "a\\{b\\}\\\\c");
    }

    #[test]
    fn test_style_content_is_hidden() {
        let rtf = encapsulate_html("<style>p{x}</style>Hi");
        assert_eq!(
            body(&rtf),
            "{\\*\\htmltag0 <style>}{\\*\\htmltag0 p\\{x\\}}{\\*\\htmltag0 </style>}Hi"
        );
    }

    #[test]
    fn test_comment_with_angle_bracket() {
        let rtf = encapsulate_html("<!-- a > b -->x");
        assert_eq!(body(&rtf), "{\\*\\htmltag0 <!-- a > b -->}x");
    }

    #[test]
    fn test_non_ascii() {
        assert_eq!(body(&encapsulate_html("é€")), "\\'e9\\'80");
        assert_eq!(body(&encapsulate_html("中")), "\\u20013?");
        assert_eq!(body(&encapsulate_html("😀")), "\\u-10179?\\u-8704?");
    }

    #[test]
    fn test_entities_keep_html_and_decode_for_rtf() {
        assert_eq!(
            body(&encapsulate_html("Tom &amp; Jerry")),
            "Tom {\\*\\htmltag0 &amp;}\\htmlrtf &\\htmlrtf0 Jerry"
        );
        assert_eq!(
            body(&encapsulate_html("a&nbsp;b")),
            "a{\\*\\htmltag0 &nbsp;}\\htmlrtf \\'a0\\htmlrtf0 b"
        );
        assert_eq!(
            body(&encapsulate_html("&#233;&#x7B;")),
            "{\\*\\htmltag0 &#233;}\\htmlrtf \\'e9\\htmlrtf0 \
             {\\*\\htmltag0 &#x7B;}\\htmlrtf \\{\\htmlrtf0 "
        );
    }

    #[test]
    fn test_bare_ampersand_is_text() {
        assert_eq!(body(&encapsulate_html("R&D &unknown; & co")), "R&D &unknown; & co");
    }

    #[test]
    fn test_newlines() {
        assert_eq!(body(&encapsulate_html("a\r\nb")), "a\\par\r\nb");
    }

    #[test]
    fn test_wrap_uncompressed_header() {
        let wrapped = wrap_uncompressed(b"{\\rtf1}").unwrap();
        assert_eq!(wrapped.len(), 16 + 7);
        assert_eq!(&wrapped[0..4], &19u32.to_le_bytes());
        assert_eq!(&wrapped[4..8], &7u32.to_le_bytes());
        assert_eq!(&wrapped[8..12], b"MELA");
        assert_eq!(&wrapped[12..16], &[0, 0, 0, 0]);
        assert_eq!(&wrapped[16..], b"{\\rtf1}");
    }
}
