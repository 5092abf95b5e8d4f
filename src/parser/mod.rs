//! Email parsing: `.eml` loading and MIME part mapping.

pub mod eml;
pub mod mime;
