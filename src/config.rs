//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the `--config` command-line option
//! 2. `$EML2MSG_CONFIG` (environment variable)
//! 3. `~/.config/eml2msg/config.toml` (Linux/macOS)
//!    `%APPDATA%\eml2msg\config.toml` (Windows)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::address::EmailAddress;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Values used when the source message leaves a field out.
    pub defaults: DefaultsConfig,
    /// What to write into the destination message.
    pub output: OutputConfig,
    /// Building `.eml` templates from an HTML folder.
    pub template: TemplateConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Placeholder values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Sender used when the message has no `From:` mailbox, as `"Name <address>"`.
    pub sender: String,
    /// Subject used when the message has none.
    pub subject: String,
    /// File name for attachments that do not declare one.
    pub attachment_name: String,
}

/// Destination message options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write a plain-text body next to the HTML body.
    pub plain_text_body: bool,
    /// Copy To/Cc/Bcc recipients into the draft.
    pub recipients: bool,
}

/// `build` subcommand settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// HTML document looked up inside the template folder.
    pub html_file: String,
    /// Subject of the generated message.
    pub subject: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sender: "Your Company <newsletter@yourcompany.com>".to_string(),
            subject: "No Subject".to_string(),
            attachment_name: "image.dat".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plain_text_body: true,
            recipients: true,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            html_file: "index.html".to_string(),
            subject: "HTML Template".to_string(),
        }
    }
}

impl DefaultsConfig {
    /// The placeholder sender as a parsed mailbox.
    pub fn sender_mailbox(&self) -> EmailAddress {
        EmailAddress::parse(&self.sender)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// `explicit` takes precedence over the environment and the standard
/// directory. Returns the default configuration if no file is found or on
/// parse error.
pub fn load_config(explicit: Option<&Path>) -> Config {
    let path = explicit.map(Path::to_path_buf).or_else(config_file_path);
    if let Some(path) = path {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EML2MSG_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("eml2msg").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eml2msg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.defaults.subject, "No Subject");
        assert_eq!(cfg.defaults.attachment_name, "image.dat");
        assert!(cfg.output.plain_text_body);
        assert_eq!(cfg.template.html_file, "index.html");
        assert_eq!(cfg.template.subject, "HTML Template");
    }

    #[test]
    fn test_default_sender_mailbox() {
        let sender = Config::default().defaults.sender_mailbox();
        assert_eq!(sender.address, "newsletter@yourcompany.com");
        assert_eq!(sender.display_name, "Your Company");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.sender, cfg.defaults.sender);
        assert_eq!(parsed.output.recipients, cfg.output.recipients);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[defaults]
subject = "(untitled)"

[output]
recipients = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.defaults.subject, "(untitled)");
        assert!(!cfg.output.recipients);
        // Other fields use defaults
        assert_eq!(cfg.defaults.attachment_name, "image.dat");
        assert!(cfg.output.plain_text_body);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nattachment_name = \"file.bin\"\n").unwrap();
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.defaults.attachment_name, "file.bin");
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults\nbroken").unwrap();
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.defaults.subject, "No Subject");
    }
}
