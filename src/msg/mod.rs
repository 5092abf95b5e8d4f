//! Outlook message (`.msg` / `.oft`) output.
//!
//! A message file is a compound file: the root storage holds the message's
//! property stream, one storage per recipient and per attachment, and the
//! named-property map.

pub mod property;
pub mod rtf;
pub mod writer;

pub use writer::{encode_msg, write_msg};
