//! The destination message builder.

use chrono::{DateTime, Utc};

use super::address::{EmailAddress, Recipient, RecipientKind};
use super::attachment::AttachmentEntry;

/// An unsent Outlook message under construction.
///
/// The draft flag is fixed: it marks the item as `MSGFLAG_UNSENT` and makes
/// the writer encapsulate the HTML body in RTF.
#[derive(Debug, Clone)]
pub struct DraftMessage {
    pub sender: EmailAddress,
    pub subject: String,
    pub recipients: Vec<Recipient>,

    /// HTML body, copied verbatim. Empty when the source has none.
    pub html_body: String,

    /// Plain-text rendition written as `PR_BODY`.
    pub text_body: Option<String>,

    /// Creation and last-modification time of the item.
    pub created: DateTime<Utc>,

    /// Attachments in source part order.
    pub attachments: Vec<AttachmentEntry>,

    draft: bool,
}

impl DraftMessage {
    pub fn new(sender: EmailAddress, subject: impl Into<String>) -> Self {
        Self {
            sender,
            subject: subject.into(),
            recipients: Vec::new(),
            html_body: String::new(),
            text_body: None,
            created: Utc::now(),
            attachments: Vec::new(),
            draft: true,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn add_attachment(&mut self, entry: AttachmentEntry) {
        self.attachments.push(entry);
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// `"; "`-joined names of recipients of one kind, as Outlook shows them.
    pub fn display_list(&self, kind: RecipientKind) -> String {
        self.recipients
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.mailbox.shown_name())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
