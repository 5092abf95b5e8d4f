//! Build an `.eml` template from a folder holding an HTML page and its images.
//!
//! Local `<img src>` references are rewritten to `cid:` URLs and the images
//! are embedded as inline parts of a `multipart/related` body, which is the
//! shape [`crate::convert`] turns into an Outlook draft.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use mail_builder::headers::content_type::ContentType;
use mail_builder::headers::raw::Raw;
use mail_builder::mime::MimePart;
use mail_builder::MessageBuilder;
use regex::{Captures, Regex};
use uuid::Uuid;

use crate::config::TemplateConfig;
use crate::error::{ConvertError, Result};
use crate::msg::writer::write_atomic;

/// Progress notices emitted while building a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateProgress<'a> {
    /// An image was embedded.
    Embedded {
        path: &'a Path,
        content_id: &'a str,
        size: usize,
    },
    /// A referenced image does not exist and was left out.
    Missing { path: &'a Path },
}

/// One embedded image.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EmbeddedImage {
    pub path: PathBuf,
    pub content_id: String,
    pub mime_type: String,
    pub size: usize,
}

/// What a successful build produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateReport {
    pub html: PathBuf,
    pub output: PathBuf,
    pub subject: String,
    pub images: Vec<EmbeddedImage>,
    pub missing: Vec<PathBuf>,
}

fn img_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid img src pattern")
    })
}

/// Whether an image source names a file inside the template folder.
fn is_local_source(src: &str) -> bool {
    let src = src.trim().to_ascii_lowercase();
    !(src.is_empty()
        || src.starts_with("http:")
        || src.starts_with("https:")
        || src.starts_with("//")
        || src.starts_with("cid:")
        || src.starts_with("data:"))
}

/// A fresh Content-ID in the `<unique>@img` form.
pub fn new_content_id() -> String {
    format!("{}@img", Uuid::new_v4().simple())
}

/// Rewrite local `<img src>` values to `cid:` URLs.
///
/// `content_id` maps a source to its Content-ID. Remote, `data:` and `cid:`
/// sources are left alone.
pub fn rewrite_image_sources(html: &str, mut content_id: impl FnMut(&str) -> String) -> String {
    img_src_regex()
        .replace_all(html, |caps: &Captures<'_>| {
            let (quote, src) = match (caps.get(2), caps.get(3)) {
                (Some(m), _) => ('"', m.as_str()),
                (None, Some(m)) => ('\'', m.as_str()),
                (None, None) => return caps[0].to_string(),
            };
            if !is_local_source(src) {
                return caps[0].to_string();
            }
            format!("{}{quote}cid:{}{quote}", &caps[1], content_id(src))
        })
        .into_owned()
}

/// Build the template message found in `folder`.
///
/// Fails with [`ConvertError::FileNotFound`] if the HTML page is missing.
/// Missing images are reported through `progress` and left out; their
/// references still point at the Content-ID they were given.
pub fn build_template(
    folder: &Path,
    config: &TemplateConfig,
    progress: &dyn Fn(&TemplateProgress<'_>),
) -> Result<(Vec<u8>, TemplateReport)> {
    let html_path = folder.join(&config.html_file);
    if !html_path.is_file() {
        return Err(ConvertError::FileNotFound(html_path));
    }
    let html = std::fs::read_to_string(&html_path).map_err(|e| ConvertError::io(&html_path, e))?;

    // Same source, same Content-ID; order of first appearance
    let mut ids: HashMap<String, String> = HashMap::new();
    let mut sources: Vec<(String, String)> = Vec::new();
    let html = rewrite_image_sources(&html, |src| {
        ids.entry(src.to_string())
            .or_insert_with(|| {
                let cid = new_content_id();
                sources.push((src.to_string(), cid.clone()));
                cid
            })
            .clone()
    });

    let mut images = Vec::new();
    let mut missing = Vec::new();
    let mut parts = vec![MimePart::new(
        ContentType::new("text/html").attribute("charset", "utf-8"),
        html,
    )];

    for (src, content_id) in sources {
        let path = folder.join(src.trim());
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "Referenced image not found");
            progress(&TemplateProgress::Missing { path: &path });
            missing.push(path);
            continue;
        }

        let data = std::fs::read(&path).map_err(|e| ConvertError::io(&path, e))?;
        let mime_type = tree_magic_mini::from_u8(&data).to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| src.clone());

        progress(&TemplateProgress::Embedded {
            path: &path,
            content_id: &content_id,
            size: data.len(),
        });
        images.push(EmbeddedImage {
            path: path.clone(),
            content_id: content_id.clone(),
            mime_type: mime_type.clone(),
            size: data.len(),
        });

        parts.push(
            MimePart::new(
                ContentType::new(mime_type).attribute("name", file_name.clone()),
                data,
            )
            .cid(content_id)
            .header(
                "Content-Disposition",
                ContentType::new("inline").attribute("filename", file_name),
            ),
        );
    }

    let body = if parts.len() == 1 {
        parts.remove(0)
    } else {
        MimePart::new("multipart/related", parts)
    };

    let bytes = MessageBuilder::new()
        .subject(config.subject.as_str())
        .header("X-Unsent", Raw::new("1"))
        .body(body)
        .write_to_vec()?;

    tracing::debug!(
        images = images.len(),
        missing = missing.len(),
        bytes = bytes.len(),
        "Built template message"
    );

    let report = TemplateReport {
        html: html_path,
        output: PathBuf::new(),
        subject: config.subject.clone(),
        images,
        missing,
    };
    Ok((bytes, report))
}

/// Build the template in `folder` and write it to `output`.
pub fn write_template(
    folder: &Path,
    output: &Path,
    config: &TemplateConfig,
    progress: &dyn Fn(&TemplateProgress<'_>),
) -> Result<TemplateReport> {
    let (bytes, mut report) = build_template(folder, config, progress)?;
    write_atomic(&bytes, output)?;

    tracing::info!(output = %output.display(), bytes = bytes.len(), "Wrote template message");

    report.output = output.to_path_buf();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::convert::{classify, PartClass};
    use crate::parser::eml::parse_eml;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn template_dir(html: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), html).unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        dir
    }

    #[test]
    fn test_rewrite_local_sources_only() {
        let html = r#"<img src="img/a.png"><IMG alt='x' SRC='img/b.gif'><img src="https://cdn.example/c.png"><img data-src="d.png" src="cid:keep">"#;
        let mut seen = Vec::new();
        let out = rewrite_image_sources(html, |src| {
            seen.push(src.to_string());
            format!("id{}", seen.len())
        });
        assert_eq!(seen, ["img/a.png", "img/b.gif"]);
        assert_eq!(
            out,
            r#"<img src="cid:id1"><IMG alt='x' SRC='cid:id2'><img src="https://cdn.example/c.png"><img data-src="d.png" src="cid:keep">"#
        );
    }

    #[test]
    fn test_content_id_shape() {
        let a = new_content_id();
        let b = new_content_id();
        assert!(a.ends_with("@img"));
        assert!(!a.contains('<'));
        assert_ne!(a, b);
    }

    #[test]
    fn test_build_embeds_inline_images() {
        let dir = template_dir(r#"<p><img src="img/logo.png"></p><p><img src="img/logo.png"></p>"#);
        std::fs::write(dir.path().join("img/logo.png"), PNG).unwrap();

        let (bytes, report) =
            build_template(dir.path(), &TemplateConfig::default(), &|_| {}).unwrap();
        assert_eq!(report.images.len(), 1);
        assert!(report.missing.is_empty());
        let cid = &report.images[0].content_id;

        let msg = parse_eml(&bytes).unwrap();
        assert_eq!(msg.subject.as_deref(), Some("HTML Template"));
        let html = msg.html_body.unwrap();
        assert_eq!(html.matches(&format!("cid:{cid}")).count(), 2);
        assert!(!html.contains("img/logo.png"));

        let image = msg.parts.iter().find(|p| p.content == PNG).unwrap();
        assert_eq!(image.file_name.as_deref(), Some("logo.png"));
        assert_eq!(classify(image), PartClass::Inline(cid.clone()));

        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("X-Unsent: 1"));
    }

    #[test]
    fn test_missing_image_is_reported_and_skipped() {
        let dir = template_dir(r#"<img src="img/here.png"><img src="img/gone.png">"#);
        std::fs::write(dir.path().join("img/here.png"), PNG).unwrap();

        let seen = RefCell::new(Vec::new());
        let (bytes, report) = build_template(dir.path(), &TemplateConfig::default(), &|p| {
            if let TemplateProgress::Missing { path } = p {
                seen.borrow_mut().push(path.to_path_buf());
            }
        })
        .unwrap();

        let gone = dir.path().join("img/gone.png");
        assert_eq!(seen.into_inner(), [gone.clone()]);
        assert_eq!(report.missing, [gone]);
        assert_eq!(report.images.len(), 1);

        let msg = parse_eml(&bytes).unwrap();
        let inline = msg
            .parts
            .iter()
            .filter(|p| matches!(classify(p), PartClass::Inline(_)))
            .count();
        assert_eq!(inline, 1);
    }

    #[test]
    fn test_page_without_images_is_single_part() {
        let dir = template_dir("<p>No pictures</p>");
        let (bytes, report) =
            build_template(dir.path(), &TemplateConfig::default(), &|_| {}).unwrap();
        assert!(report.images.is_empty());
        let msg = parse_eml(&bytes).unwrap();
        assert!(msg.html_body.unwrap().contains("No pictures"));
        assert_eq!(msg.parts.len(), 1);
    }

    #[test]
    fn test_missing_html_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.eml");
        let err = write_template(dir.path(), &output, &TemplateConfig::default(), &|_| {})
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!output.exists());
    }

    #[test]
    fn test_write_template_then_convert() {
        let dir = template_dir(r#"<img src="img/logo.png">"#);
        std::fs::write(dir.path().join("img/logo.png"), PNG).unwrap();
        let eml = dir.path().join("out.eml");
        let msg = dir.path().join("out.oft");

        let report =
            write_template(dir.path(), &eml, &TemplateConfig::default(), &|_| {}).unwrap();
        assert_eq!(report.output, eml);

        let converted =
            crate::convert::convert(&eml, &msg, &crate::config::Config::default(), &|_| {})
                .unwrap();
        assert_eq!(converted.subject, "HTML Template");
        assert_eq!(converted.attachments.len(), 1);
        assert!(converted.attachments[0].inline);
        assert_eq!(
            converted.attachments[0].content_id.as_deref(),
            Some(report.images[0].content_id.as_str())
        );
    }
}
