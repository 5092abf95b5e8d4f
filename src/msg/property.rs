//! MAPI property tags and the `__properties_version1.0` stream encoding.
//!
//! Every property occupies a 16-byte entry: tag, flags and an 8-byte value.
//! Fixed-size values live in the entry itself; strings and binaries store
//! their size there and their bytes in a `__substg1.0_XXXXXXXX` stream.

use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Utc};

/// Property value types used by this writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PropType {
    Integer32 = 0x0003,
    Boolean = 0x000B,
    Time = 0x0040,
    String = 0x001F,
    Binary = 0x0102,
}

/// A property id paired with its value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropTag {
    pub id: u16,
    pub ptype: PropType,
}

impl PropTag {
    pub const fn new(id: u16, ptype: PropType) -> Self {
        Self { id, ptype }
    }

    /// The 32-bit tag: id in the high word, type in the low word.
    pub fn tag(self) -> u32 {
        (u32::from(self.id) << 16) | self.ptype as u32
    }

    /// Name of the stream holding a variable-length value.
    pub fn stream_name(self) -> String {
        format!("__substg1.0_{:08X}", self.tag())
    }
}

pub mod tags {
    use super::{PropTag, PropType::*};

    // Message envelope
    pub const PR_MESSAGE_CLASS: PropTag = PropTag::new(0x001A, String);
    pub const PR_IMPORTANCE: PropTag = PropTag::new(0x0017, Integer32);
    pub const PR_PRIORITY: PropTag = PropTag::new(0x0026, Integer32);
    pub const PR_SENSITIVITY: PropTag = PropTag::new(0x0036, Integer32);
    pub const PR_SUBJECT: PropTag = PropTag::new(0x0037, String);
    pub const PR_SUBJECT_PREFIX: PropTag = PropTag::new(0x003D, String);
    pub const PR_CONVERSATION_TOPIC: PropTag = PropTag::new(0x0070, String);
    pub const PR_NORMALIZED_SUBJECT: PropTag = PropTag::new(0x0E1D, String);
    pub const PR_MESSAGE_FLAGS: PropTag = PropTag::new(0x0E07, Integer32);
    pub const PR_HASATTACH: PropTag = PropTag::new(0x0E1B, Boolean);
    pub const PR_DISPLAY_BCC: PropTag = PropTag::new(0x0E02, String);
    pub const PR_DISPLAY_CC: PropTag = PropTag::new(0x0E03, String);
    pub const PR_DISPLAY_TO: PropTag = PropTag::new(0x0E04, String);
    pub const PR_STORE_SUPPORT_MASK: PropTag = PropTag::new(0x340D, Integer32);
    pub const PR_INTERNET_CPID: PropTag = PropTag::new(0x3FDE, Integer32);
    pub const PR_MESSAGE_CODEPAGE: PropTag = PropTag::new(0x3FFD, Integer32);
    pub const PR_CREATION_TIME: PropTag = PropTag::new(0x3007, Time);
    pub const PR_LAST_MODIFICATION_TIME: PropTag = PropTag::new(0x3008, Time);

    // Sender
    pub const PR_SENT_REPRESENTING_NAME: PropTag = PropTag::new(0x0042, String);
    pub const PR_SENT_REPRESENTING_ADDRTYPE: PropTag = PropTag::new(0x0064, String);
    pub const PR_SENT_REPRESENTING_EMAIL_ADDRESS: PropTag = PropTag::new(0x0065, String);
    pub const PR_SENDER_NAME: PropTag = PropTag::new(0x0C1A, String);
    pub const PR_SENDER_ADDRTYPE: PropTag = PropTag::new(0x0C1E, String);
    pub const PR_SENDER_EMAIL_ADDRESS: PropTag = PropTag::new(0x0C1F, String);
    pub const PR_SENDER_SMTP_ADDRESS: PropTag = PropTag::new(0x5D01, String);
    pub const PR_SENT_REPRESENTING_SMTP_ADDRESS: PropTag = PropTag::new(0x5D02, String);

    // Body
    pub const PR_BODY: PropTag = PropTag::new(0x1000, String);
    pub const PR_RTF_COMPRESSED: PropTag = PropTag::new(0x1009, Binary);
    pub const PR_HTML: PropTag = PropTag::new(0x1013, Binary);
    pub const PR_NATIVE_BODY_INFO: PropTag = PropTag::new(0x1016, Integer32);
    pub const PR_RTF_IN_SYNC: PropTag = PropTag::new(0x0E1F, Boolean);

    // Recipients
    pub const PR_RECIPIENT_TYPE: PropTag = PropTag::new(0x0C15, Integer32);
    pub const PR_OBJECT_TYPE: PropTag = PropTag::new(0x0FFE, Integer32);
    pub const PR_ROWID: PropTag = PropTag::new(0x3000, Integer32);
    pub const PR_DISPLAY_NAME: PropTag = PropTag::new(0x3001, String);
    pub const PR_ADDRTYPE: PropTag = PropTag::new(0x3002, String);
    pub const PR_EMAIL_ADDRESS: PropTag = PropTag::new(0x3003, String);
    pub const PR_DISPLAY_TYPE: PropTag = PropTag::new(0x3900, Integer32);
    pub const PR_SMTP_ADDRESS: PropTag = PropTag::new(0x39FE, String);

    // Attachments
    pub const PR_ATTACH_SIZE: PropTag = PropTag::new(0x0E20, Integer32);
    pub const PR_ATTACH_NUM: PropTag = PropTag::new(0x0E21, Integer32);
    pub const PR_ATTACH_DATA_BIN: PropTag = PropTag::new(0x3701, Binary);
    pub const PR_ATTACH_EXTENSION: PropTag = PropTag::new(0x3703, String);
    pub const PR_ATTACH_FILENAME: PropTag = PropTag::new(0x3704, String);
    pub const PR_ATTACH_METHOD: PropTag = PropTag::new(0x3705, Integer32);
    pub const PR_ATTACH_LONG_FILENAME: PropTag = PropTag::new(0x3707, String);
    pub const PR_RENDERING_POSITION: PropTag = PropTag::new(0x370B, Integer32);
    pub const PR_ATTACH_MIME_TAG: PropTag = PropTag::new(0x370E, String);
    pub const PR_ATTACH_CONTENT_ID: PropTag = PropTag::new(0x3712, String);
    pub const PR_ATTACH_FLAGS: PropTag = PropTag::new(0x3714, Integer32);
    pub const PR_ATTACHMENT_HIDDEN: PropTag = PropTag::new(0x7FFE, Boolean);
}

// Flag and enumeration values.
pub const MSGFLAG_UNSENT: i32 = 0x0008;
pub const MSGFLAG_HASATTACH: i32 = 0x0010;
pub const STORE_UNICODE_OK: i32 = 0x0004_0000;
pub const CP_UTF8: i32 = 65001;
pub const IMPORTANCE_NORMAL: i32 = 1;
pub const NATIVE_BODY_HTML: i32 = 3;
pub const MAPI_MAILUSER: i32 = 6;
pub const MAPI_ATTACH: i32 = 7;
pub const DT_MAILUSER: i32 = 0;
pub const ATTACH_BY_VALUE: i32 = 1;
pub const ATT_MHTML_REF: i32 = 0x0004;

/// `PROPATTR_READABLE | PROPATTR_WRITABLE`
const PROP_FLAGS: u32 = 0x0000_0006;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Integer32(i32),
    Boolean(bool),
    Time(DateTime<Utc>),
    String(String),
    Binary(Vec<u8>),
}

impl PropValue {
    fn ptype(&self) -> PropType {
        match self {
            Self::Integer32(_) => PropType::Integer32,
            Self::Boolean(_) => PropType::Boolean,
            Self::Time(_) => PropType::Time,
            Self::String(_) => PropType::String,
            Self::Binary(_) => PropType::Binary,
        }
    }
}

/// Convert a UTC time into a Windows FILETIME (100 ns ticks since 1601).
pub fn filetime(dt: &DateTime<Utc>) -> u64 {
    let secs = (dt.timestamp() + FILETIME_UNIX_OFFSET).max(0) as u64;
    secs * 10_000_000 + u64::from(dt.timestamp_subsec_nanos() / 100)
}

/// A byte count as a 32-bit size field.
///
/// Property entries and the RTF header cannot describe values of 4 GiB or more.
pub fn size_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("value of {len} bytes does not fit a 32-bit size field"),
        )
    })
}

/// UTF-16LE bytes of a string, without terminator.
pub fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// The properties of one storage (message, recipient, or attachment).
#[derive(Debug, Default)]
pub struct PropertyStream {
    entries: Vec<(PropTag, PropValue)>,
}

/// An encoded property stream plus the value streams it refers to.
#[derive(Debug)]
pub struct EncodedProperties {
    pub properties: Vec<u8>,
    pub value_streams: Vec<(String, Vec<u8>)>,
}

impl PropertyStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property. The value must match the tag's type.
    pub fn set(&mut self, tag: PropTag, value: PropValue) {
        debug_assert_eq!(tag.ptype, value.ptype(), "type mismatch for tag {:08X}", tag.tag());
        self.entries.push((tag, value));
    }

    pub fn set_i32(&mut self, tag: PropTag, value: i32) {
        self.set(tag, PropValue::Integer32(value));
    }

    pub fn set_bool(&mut self, tag: PropTag, value: bool) {
        self.set(tag, PropValue::Boolean(value));
    }

    pub fn set_time(&mut self, tag: PropTag, value: DateTime<Utc>) {
        self.set(tag, PropValue::Time(value));
    }

    pub fn set_string(&mut self, tag: PropTag, value: impl Into<String>) {
        self.set(tag, PropValue::String(value.into()));
    }

    pub fn set_binary(&mut self, tag: PropTag, value: Vec<u8>) {
        self.set(tag, PropValue::Binary(value));
    }

    pub fn get(&self, tag: PropTag) -> Option<&PropValue> {
        self.entries.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the entries after `header`.
    ///
    /// String sizes count the two-byte terminator, which the value stream
    /// itself does not carry.
    pub fn encode(&self, header: &[u8]) -> io::Result<EncodedProperties> {
        let mut properties = Vec::with_capacity(header.len() + self.entries.len() * 16);
        properties.extend_from_slice(header);
        let mut value_streams = Vec::new();

        for (tag, value) in &self.entries {
            properties.write_u32::<LittleEndian>(tag.tag())?;
            properties.write_u32::<LittleEndian>(PROP_FLAGS)?;
            match value {
                PropValue::Integer32(v) => {
                    properties.write_i32::<LittleEndian>(*v)?;
                    properties.write_u32::<LittleEndian>(0)?;
                }
                PropValue::Boolean(v) => {
                    properties.write_u16::<LittleEndian>(u16::from(*v))?;
                    properties.extend_from_slice(&[0; 6]);
                }
                PropValue::Time(v) => {
                    properties.write_u64::<LittleEndian>(filetime(v))?;
                }
                PropValue::String(v) => {
                    let bytes = utf16le(v);
                    properties.write_u32::<LittleEndian>(size_u32(bytes.len() + 2)?)?;
                    properties.write_u32::<LittleEndian>(0)?;
                    value_streams.push((tag.stream_name(), bytes));
                }
                PropValue::Binary(v) => {
                    properties.write_u32::<LittleEndian>(size_u32(v.len())?)?;
                    properties.write_u32::<LittleEndian>(0)?;
                    value_streams.push((tag.stream_name(), v.clone()));
                }
            }
        }

        Ok(EncodedProperties {
            properties,
            value_streams,
        })
    }
}

/// Header of the top-level message's property stream.
///
/// Next-id fields equal the counts since ids are assigned from zero.
pub fn message_header(recipients: u32, attachments: u32) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(32);
    header.extend_from_slice(&[0; 8]);
    for value in [recipients, attachments, recipients, attachments] {
        header.write_u32::<LittleEndian>(value)?;
    }
    header.extend_from_slice(&[0; 8]);
    Ok(header)
}

/// Header of a recipient or attachment property stream.
pub const SUBOBJECT_HEADER: [u8; 8] = [0; 8];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tag_and_stream_name() {
        assert_eq!(tags::PR_SUBJECT.tag(), 0x0037_001F);
        assert_eq!(tags::PR_SUBJECT.stream_name(), "__substg1.0_0037001F");
        assert_eq!(tags::PR_ATTACH_DATA_BIN.stream_name(), "__substg1.0_37010102");
    }

    #[test]
    fn test_size_u32_bounds() {
        assert_eq!(size_u32(0).unwrap(), 0);
        assert_eq!(size_u32(u32::MAX as usize).unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        {
            let err = size_u32(u32::MAX as usize + 1).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_filetime_epochs() {
        let unix_epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(filetime(&unix_epoch), 116_444_736_000_000_000);
        let dt = Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap();
        assert_eq!(filetime(&dt), (1_704_708_000 + 11_644_473_600) * 10_000_000);
    }

    #[test]
    fn test_encode_fixed_values() {
        let mut props = PropertyStream::new();
        props.set_i32(tags::PR_MESSAGE_FLAGS, MSGFLAG_UNSENT);
        props.set_bool(tags::PR_HASATTACH, true);
        let encoded = props.encode(&SUBOBJECT_HEADER).unwrap();

        assert_eq!(encoded.properties.len(), 8 + 2 * 16);
        assert!(encoded.value_streams.is_empty());
        let first = &encoded.properties[8..24];
        assert_eq!(&first[0..4], &0x0E07_0003u32.to_le_bytes());
        assert_eq!(&first[4..8], &6u32.to_le_bytes());
        assert_eq!(&first[8..12], &8i32.to_le_bytes());
        let second = &encoded.properties[24..40];
        assert_eq!(&second[8..16], &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_string_value() {
        let mut props = PropertyStream::new();
        props.set_string(tags::PR_SUBJECT, "Hé");
        let encoded = props.encode(&[]).unwrap();

        // size includes the UTF-16 terminator
        assert_eq!(&encoded.properties[8..12], &6u32.to_le_bytes());
        assert_eq!(encoded.value_streams.len(), 1);
        let (name, bytes) = &encoded.value_streams[0];
        assert_eq!(name, "__substg1.0_0037001F");
        assert_eq!(bytes, &vec![b'H', 0, 0xE9, 0]);
    }

    #[test]
    fn test_message_header_layout() {
        let header = message_header(2, 3).unwrap();
        assert_eq!(header.len(), 32);
        assert_eq!(&header[8..12], &2u32.to_le_bytes());
        assert_eq!(&header[12..16], &3u32.to_le_bytes());
        assert_eq!(&header[16..20], &2u32.to_le_bytes());
        assert_eq!(&header[20..24], &3u32.to_le_bytes());
    }

    #[test]
    fn test_get() {
        let mut props = PropertyStream::new();
        props.set_string(tags::PR_MESSAGE_CLASS, "IPM.Note");
        assert_eq!(
            props.get(tags::PR_MESSAGE_CLASS),
            Some(&PropValue::String("IPM.Note".into()))
        );
        assert_eq!(props.get(tags::PR_SUBJECT), None);
        assert_eq!(props.len(), 1);
    }
}
