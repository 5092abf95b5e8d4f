//! EML → MSG conversion: field mapping and attachment classification.

use std::path::{Path, PathBuf};

use crate::config::{Config, DefaultsConfig, OutputConfig};
use crate::error::{ConvertError, Result};
use crate::model::address::{EmailAddress, Recipient, RecipientKind};
use crate::model::attachment::AttachmentEntry;
use crate::model::draft::DraftMessage;
use crate::model::mail::{BodyPart, SourceMessage};
use crate::msg;
use crate::parser::{eml, mime};

/// Values substituted for fields the source message leaves out.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pub sender: EmailAddress,
    pub subject: String,
    pub attachment_name: String,
}

impl From<&DefaultsConfig> for Placeholders {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            sender: defaults.sender_mailbox(),
            subject: defaults.subject.clone(),
            attachment_name: defaults.attachment_name.clone(),
        }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::from(&DefaultsConfig::default())
    }
}

/// Progress notices emitted while converting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress<'a> {
    /// The input exists and is about to be parsed.
    Reading,
    /// An inline image was added.
    Inline {
        file_name: &'a str,
        content_id: &'a str,
        size: usize,
    },
    /// A regular attachment was added.
    Attachment { file_name: &'a str, size: usize },
}

/// How a body part is carried into the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartClass {
    /// `text/plain` or `text/html`: represented by the body fields only.
    BodyText,
    /// Inline image, with its Content-ID stripped of angle brackets.
    Inline(String),
    /// Regular attachment.
    Regular,
}

/// Classify a body part.
///
/// A part is inline iff it has a non-empty Content-ID and a disposition
/// equal to `inline` (any case).
pub fn classify(part: &BodyPart) -> PartClass {
    if part.mime_type.is_body_text() {
        return PartClass::BodyText;
    }

    let content_id = part
        .content_id
        .as_deref()
        .map(|id| mime::strip_angle_brackets(id.trim()))
        .filter(|id| !id.is_empty());
    let disposition_inline = part
        .disposition
        .as_deref()
        .is_some_and(|d| d.trim().eq_ignore_ascii_case("inline"));

    match content_id {
        Some(id) if disposition_inline => PartClass::Inline(id.to_string()),
        _ => PartClass::Regular,
    }
}

/// First `From:` mailbox, with placeholders for whatever is missing.
pub fn resolve_sender(source: &SourceMessage, placeholders: &Placeholders) -> EmailAddress {
    match source.from.first() {
        Some(mailbox) => {
            let name = if mailbox.display_name.is_empty() {
                placeholders.sender.display_name.clone()
            } else {
                mailbox.display_name.clone()
            };
            EmailAddress::new(name, mailbox.address.clone())
        }
        None => placeholders.sender.clone(),
    }
}

/// Populate a new draft from the source message.
///
/// Attachments keep source part order; `progress` is told about each one.
pub fn build_draft(
    source: &SourceMessage,
    placeholders: &Placeholders,
    options: &OutputConfig,
    progress: &dyn Fn(&Progress<'_>),
) -> DraftMessage {
    let sender = resolve_sender(source, placeholders);
    let subject = source
        .subject
        .clone()
        .unwrap_or_else(|| placeholders.subject.clone());

    let mut draft = DraftMessage::new(sender, subject);
    draft.html_body = source.html_body.clone().unwrap_or_default();

    if let Some(date) = source.date {
        draft.created = date;
    }

    if options.plain_text_body {
        draft.text_body = source
            .text_body
            .clone()
            .or_else(|| source.html_body.as_deref().map(mime::html_to_text))
            .filter(|text| !text.trim().is_empty());
    }

    if options.recipients {
        let lists = [
            (RecipientKind::To, &source.to),
            (RecipientKind::Cc, &source.cc),
            (RecipientKind::Bcc, &source.bcc),
        ];
        for (kind, mailboxes) in lists {
            draft
                .recipients
                .extend(mailboxes.iter().cloned().map(|mailbox| Recipient { kind, mailbox }));
        }
    }

    for part in &source.parts {
        let class = classify(part);
        if class == PartClass::BodyText {
            continue;
        }

        let file_name = part
            .file_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| placeholders.attachment_name.clone());
        let data = part.content.clone();
        let size = data.len();
        let mime_type = part.mime_type.to_string();

        match class {
            PartClass::Inline(content_id) => {
                progress(&Progress::Inline {
                    file_name: &file_name,
                    content_id: &content_id,
                    size,
                });
                draft.add_attachment(AttachmentEntry::inline(data, file_name, mime_type, content_id));
            }
            _ => {
                progress(&Progress::Attachment {
                    file_name: &file_name,
                    size,
                });
                draft.add_attachment(AttachmentEntry::regular(data, file_name, mime_type));
            }
        }
    }

    tracing::debug!(
        sender = %draft.sender,
        attachments = draft.attachments.len(),
        recipients = draft.recipients.len(),
        "Built draft"
    );

    draft
}

/// Summary of one attachment written to the output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AttachmentSummary {
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    pub inline: bool,
    pub content_id: Option<String>,
}

/// What a successful conversion produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sender: EmailAddress,
    pub subject: String,
    pub recipients: Vec<Recipient>,
    pub html_body_bytes: usize,
    pub attachments: Vec<AttachmentSummary>,
}

impl ConversionReport {
    fn new(input: &Path, output: &Path, draft: &DraftMessage) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            sender: draft.sender.clone(),
            subject: draft.subject.clone(),
            recipients: draft.recipients.clone(),
            html_body_bytes: draft.html_body.len(),
            attachments: draft
                .attachments
                .iter()
                .map(|a| AttachmentSummary {
                    file_name: a.file_name.clone(),
                    mime_type: a.mime_type.clone(),
                    size: a.data.len(),
                    inline: a.is_inline,
                    content_id: a.content_id.clone(),
                })
                .collect(),
        }
    }
}

/// Convert the `.eml` at `input` into an Outlook draft at `output`.
///
/// Fails with [`ConvertError::FileNotFound`] before any other I/O if
/// `input` is not an existing file. Nothing is written unless every step
/// succeeds.
pub fn convert(
    input: &Path,
    output: &Path,
    config: &Config,
    progress: &dyn Fn(&Progress<'_>),
) -> Result<ConversionReport> {
    if !input.is_file() {
        return Err(ConvertError::FileNotFound(input.to_path_buf()));
    }

    progress(&Progress::Reading);
    let source = eml::load_eml(input)?;

    let placeholders = Placeholders::from(&config.defaults);
    let draft = build_draft(&source, &placeholders, &config.output, progress);

    msg::write_msg(&draft, output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        attachments = draft.attachments.len(),
        "Conversion completed"
    );

    Ok(ConversionReport::new(input, output, &draft))
}
