//! Core data model types: source messages, draft messages, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod draft;
pub mod mail;
