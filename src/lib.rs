//! `eml2msg`: convert `.eml` messages into Outlook drafts.
//!
//! This crate parses an RFC 5322 message, maps it onto an unsent Outlook
//! message (sender, subject, HTML body, inline images and attachments) and
//! writes it as a `.msg` compound file, usable as an `.oft` template.
//! It can also assemble the `.eml` itself from an HTML folder and its images.

pub mod config;
pub mod convert;
pub mod error;
pub mod i18n;
pub mod model;
pub mod msg;
pub mod parser;
pub mod template;
