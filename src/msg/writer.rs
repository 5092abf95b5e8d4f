//! Compound file layout of an Outlook message and the atomic file write.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use cfb::{CompoundFile, Version};
use uuid::Uuid;

use crate::error::{ConvertError, Result};
use crate::model::address::{EmailAddress, RecipientKind};
use crate::model::attachment::AttachmentEntry;
use crate::model::draft::DraftMessage;

use super::property::{self as prop, tags, PropertyStream};
use super::rtf;

/// CLSID of the root storage of an Outlook message file.
pub const MSG_CLSID: Uuid = Uuid::from_u128(0x0006_F046_0000_0000_C000_0000_0000_0046);

pub const PROPERTIES_STREAM: &str = "__properties_version1.0";
pub const NAMEID_STORAGE: &str = "__nameid_version1.0";

const NAMEID_STREAMS: [&str; 3] = [
    "__substg1.0_00020102", // GUID stream
    "__substg1.0_00030102", // entry stream
    "__substg1.0_00040102", // string stream
];

pub fn recipient_storage(index: usize) -> String {
    format!("__recip_version1.0_#{index:08X}")
}

pub fn attachment_storage(index: usize) -> String {
    format!("__attach_version1.0_#{index:08X}")
}

/// A count, index or size as a MAPI 32-bit integer.
fn mapi_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| ConvertError::Encode(format!("{what} {value} does not fit a 32-bit property")))
}

/// Encode the draft and write it to `path`.
///
/// The file is assembled in memory, written to a temporary file next to
/// `path` and renamed into place, so a failure leaves no partial output.
pub fn write_msg(draft: &DraftMessage, path: &Path) -> Result<()> {
    let bytes = encode_msg(draft)?;
    write_atomic(&bytes, path)?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote message file");
    Ok(())
}

/// Write `bytes` to a temporary file next to `path`, then rename it over `path`.
pub fn write_atomic(bytes: &[u8], path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.flush())
        .map_err(|e| ConvertError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| ConvertError::io(path, e.error))?;
    Ok(())
}

/// Encode the draft as the bytes of an Outlook message file.
pub fn encode_msg(draft: &DraftMessage) -> Result<Vec<u8>> {
    let mut comp = CompoundFile::create_with_version(Version::V3, Cursor::new(Vec::new()))?;
    comp.set_storage_clsid("/", MSG_CLSID)?;

    comp.create_storage(format!("/{NAMEID_STORAGE}"))?;
    for stream in NAMEID_STREAMS {
        write_stream(&mut comp, &format!("/{NAMEID_STORAGE}/{stream}"), &[])?;
    }

    for (index, recipient) in draft.recipients.iter().enumerate() {
        let storage = format!("/{}", recipient_storage(index));
        comp.create_storage(&storage)?;
        let props = recipient_properties(index, recipient.kind, &recipient.mailbox)?;
        write_properties(&mut comp, &storage, &props, &prop::SUBOBJECT_HEADER)?;
    }

    for (index, attachment) in draft.attachments.iter().enumerate() {
        let storage = format!("/{}", attachment_storage(index));
        comp.create_storage(&storage)?;
        let props = attachment_properties(index, attachment, draft)?;
        write_properties(&mut comp, &storage, &props, &prop::SUBOBJECT_HEADER)?;
    }

    let header = prop::message_header(
        prop::size_u32(draft.recipients.len())?,
        prop::size_u32(draft.attachments.len())?,
    )?;
    let props = message_properties(draft)?;
    write_properties(&mut comp, "", &props, &header)?;

    comp.flush()?;
    Ok(comp.into_inner().into_inner())
}

/// Top-level properties of the message item.
pub fn message_properties(draft: &DraftMessage) -> Result<PropertyStream> {
    let mut props = PropertyStream::new();

    props.set_string(tags::PR_MESSAGE_CLASS, "IPM.Note");
    props.set_string(tags::PR_SUBJECT, draft.subject.as_str());
    props.set_string(tags::PR_SUBJECT_PREFIX, "");
    props.set_string(tags::PR_NORMALIZED_SUBJECT, draft.subject.as_str());
    props.set_string(tags::PR_CONVERSATION_TOPIC, draft.subject.as_str());
    props.set_i32(tags::PR_IMPORTANCE, prop::IMPORTANCE_NORMAL);
    props.set_i32(tags::PR_PRIORITY, 0);
    props.set_i32(tags::PR_SENSITIVITY, 0);

    let mut flags = 0;
    if draft.is_draft() {
        flags |= prop::MSGFLAG_UNSENT;
    }
    if draft.has_attachments() {
        flags |= prop::MSGFLAG_HASATTACH;
    }
    props.set_i32(tags::PR_MESSAGE_FLAGS, flags);
    props.set_bool(tags::PR_HASATTACH, draft.has_attachments());

    props.set_i32(tags::PR_STORE_SUPPORT_MASK, prop::STORE_UNICODE_OK);
    props.set_i32(tags::PR_INTERNET_CPID, prop::CP_UTF8);
    props.set_i32(tags::PR_MESSAGE_CODEPAGE, prop::CP_UTF8);
    props.set_time(tags::PR_CREATION_TIME, draft.created);
    props.set_time(tags::PR_LAST_MODIFICATION_TIME, draft.created);

    let sender = &draft.sender;
    props.set_string(tags::PR_SENDER_NAME, sender.shown_name());
    props.set_string(tags::PR_SENDER_EMAIL_ADDRESS, sender.address.as_str());
    props.set_string(tags::PR_SENDER_ADDRTYPE, "SMTP");
    props.set_string(tags::PR_SENDER_SMTP_ADDRESS, sender.address.as_str());
    props.set_string(tags::PR_SENT_REPRESENTING_NAME, sender.shown_name());
    props.set_string(tags::PR_SENT_REPRESENTING_EMAIL_ADDRESS, sender.address.as_str());
    props.set_string(tags::PR_SENT_REPRESENTING_ADDRTYPE, "SMTP");
    props.set_string(tags::PR_SENT_REPRESENTING_SMTP_ADDRESS, sender.address.as_str());

    props.set_string(tags::PR_DISPLAY_TO, draft.display_list(RecipientKind::To));
    props.set_string(tags::PR_DISPLAY_CC, draft.display_list(RecipientKind::Cc));
    props.set_string(tags::PR_DISPLAY_BCC, draft.display_list(RecipientKind::Bcc));

    if let Some(text) = &draft.text_body {
        props.set_string(tags::PR_BODY, text.as_str());
    }
    props.set_binary(tags::PR_HTML, draft.html_body.as_bytes().to_vec());
    if draft.is_draft() {
        let rtf = rtf::encapsulate_html(&draft.html_body);
        props.set_binary(tags::PR_RTF_COMPRESSED, rtf::wrap_uncompressed(rtf.as_bytes())?);
        props.set_bool(tags::PR_RTF_IN_SYNC, true);
    }
    props.set_i32(tags::PR_NATIVE_BODY_INFO, prop::NATIVE_BODY_HTML);

    Ok(props)
}

fn recipient_properties(
    index: usize,
    kind: RecipientKind,
    mailbox: &EmailAddress,
) -> Result<PropertyStream> {
    let mut props = PropertyStream::new();
    props.set_i32(tags::PR_ROWID, mapi_i32(index, "recipient row")?);
    props.set_i32(tags::PR_RECIPIENT_TYPE, kind as i32);
    props.set_i32(tags::PR_OBJECT_TYPE, prop::MAPI_MAILUSER);
    props.set_i32(tags::PR_DISPLAY_TYPE, prop::DT_MAILUSER);
    props.set_string(tags::PR_DISPLAY_NAME, mailbox.shown_name());
    props.set_string(tags::PR_EMAIL_ADDRESS, mailbox.address.as_str());
    props.set_string(tags::PR_ADDRTYPE, "SMTP");
    props.set_string(tags::PR_SMTP_ADDRESS, mailbox.address.as_str());
    Ok(props)
}

fn attachment_properties(
    index: usize,
    attachment: &AttachmentEntry,
    draft: &DraftMessage,
) -> Result<PropertyStream> {
    let mut props = PropertyStream::new();
    props.set_i32(tags::PR_ATTACH_NUM, mapi_i32(index, "attachment number")?);
    props.set_i32(tags::PR_OBJECT_TYPE, prop::MAPI_ATTACH);
    props.set_i32(tags::PR_ATTACH_METHOD, prop::ATTACH_BY_VALUE);
    props.set_i32(tags::PR_ATTACH_SIZE, mapi_i32(attachment.data.len(), "attachment size")?);
    props.set_string(tags::PR_ATTACH_FILENAME, attachment.file_name.as_str());
    props.set_string(tags::PR_ATTACH_LONG_FILENAME, attachment.file_name.as_str());
    props.set_string(tags::PR_DISPLAY_NAME, attachment.file_name.as_str());
    props.set_string(tags::PR_ATTACH_EXTENSION, attachment.extension());
    props.set_string(tags::PR_ATTACH_MIME_TAG, attachment.mime_type.as_str());
    props.set_i32(tags::PR_RENDERING_POSITION, attachment.rendering_position);
    props.set_time(tags::PR_CREATION_TIME, draft.created);
    props.set_time(tags::PR_LAST_MODIFICATION_TIME, draft.created);

    if attachment.is_inline {
        if let Some(cid) = &attachment.content_id {
            props.set_string(tags::PR_ATTACH_CONTENT_ID, cid.as_str());
        }
        props.set_i32(tags::PR_ATTACH_FLAGS, prop::ATT_MHTML_REF);
        props.set_bool(tags::PR_ATTACHMENT_HIDDEN, true);
    }

    props.set_binary(tags::PR_ATTACH_DATA_BIN, attachment.data.clone());
    Ok(props)
}

/// Write a storage's property stream and its value streams.
fn write_properties<F: Read + Write + Seek>(
    comp: &mut CompoundFile<F>,
    storage: &str,
    props: &PropertyStream,
    header: &[u8],
) -> Result<()> {
    let encoded = props.encode(header)?;
    write_stream(comp, &format!("{storage}/{PROPERTIES_STREAM}"), &encoded.properties)?;
    for (name, bytes) in &encoded.value_streams {
        write_stream(comp, &format!("{storage}/{name}"), bytes)?;
    }
    Ok(())
}

fn write_stream<F: Read + Write + Seek>(
    comp: &mut CompoundFile<F>,
    path: &str,
    data: &[u8],
) -> Result<()> {
    let mut stream = comp.create_stream(path)?;
    stream.write_all(data)?;
    Ok(())
}
