//! Attachment entries of the destination message.

/// Rendering position meaning "no fixed position, append at the default place".
pub const RENDER_DEFAULT_POSITION: i32 = -1;

/// One entry of the draft's attachment table.
///
/// Owns its decoded bytes until the compound file writer consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEntry {
    /// Decoded attachment payload.
    pub data: Vec<u8>,

    /// File name. Never empty: a placeholder is used if the part has none.
    pub file_name: String,

    /// MIME type string written as the attachment MIME tag (e.g. `"image/png"`).
    pub mime_type: String,

    /// Character position in the body, or [`RENDER_DEFAULT_POSITION`].
    pub rendering_position: i32,

    /// `true` if the attachment is referenced from the HTML body via `cid:`.
    pub is_inline: bool,

    /// Content-ID without angle brackets. Set only for inline entries.
    pub content_id: Option<String>,
}

impl AttachmentEntry {
    /// A regular attachment listed in the attachment well.
    pub fn regular(data: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            rendering_position: RENDER_DEFAULT_POSITION,
            is_inline: false,
            content_id: None,
        }
    }

    /// An inline image referenced from the HTML body by `content_id`.
    pub fn inline(
        data: Vec<u8>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            rendering_position: RENDER_DEFAULT_POSITION,
            is_inline: true,
            content_id: Some(content_id.into()),
        }
    }

    /// File extension including the dot (`".pdf"`), or empty.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_has_no_content_id() {
        let att = AttachmentEntry::regular(vec![1, 2], "a.pdf", "application/pdf");
        assert!(!att.is_inline);
        assert_eq!(att.content_id, None);
        assert_eq!(att.rendering_position, RENDER_DEFAULT_POSITION);
    }

    #[test]
    fn test_inline_keeps_content_id() {
        let att = AttachmentEntry::inline(vec![], "logo.png", "image/png", "img1");
        assert!(att.is_inline);
        assert_eq!(att.content_id.as_deref(), Some("img1"));
    }

    #[test]
    fn test_extension() {
        let att = AttachmentEntry::regular(vec![], "report.final.pdf", "application/pdf");
        assert_eq!(att.extension(), ".pdf");
        let att = AttachmentEntry::regular(vec![], "README", "text/x-readme");
        assert_eq!(att.extension(), "");
    }
}
