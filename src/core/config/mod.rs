//! Run configuration, loaded once at startup.
//!
//! Values come from a TOML file. Secrets can be supplied through the
//! environment instead (a `.env.local` file is honoured), which keeps
//! credentials out of the file that lists feeds and keywords.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lettre::message::Mailbox;
use serde::Deserialize;

use crate::core::feed::FeedSource;
use crate::core::importer::{merge_sources, parse_opml, ImportError};
use crate::core::llm::{validate_config, LlmConfig};

pub const DEFAULT_CONFIG_PATH: &str = "digest.toml";
pub const ENV_FILE: &str = ".env.local";

pub const ENV_LLM_API_KEY: &str = "RSS_DIGEST_LLM_API_KEY";
pub const ENV_SMTP_USERNAME: &str = "RSS_DIGEST_SMTP_USERNAME";
pub const ENV_SMTP_PASSWORD: &str = "RSS_DIGEST_SMTP_PASSWORD";
pub const ENV_RECIPIENT: &str = "RSS_DIGEST_RECIPIENT";

const REMEDIATION: &str = "\
To fix this:
  1. cp digest.example.toml digest.toml
  2. fill in the missing values in digest.toml
  3. or export the secrets instead (RSS_DIGEST_LLM_API_KEY, RSS_DIGEST_SMTP_USERNAME,
     RSS_DIGEST_SMTP_PASSWORD, RSS_DIGEST_RECIPIENT), e.g. in .env.local";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to import feeds from {}: {source}", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: ImportError,
    },
    #[error("configuration is incomplete:\n{}\n\n{}", bullet_list(.missing), REMEDIATION)]
    Incomplete { missing: Vec<String> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub smtp: SmtpSettings,
    #[serde(default)]
    pub digest: DigestSettings,
    #[serde(default)]
    pub feeds: BTreeMap<String, String>,
    #[serde(default)]
    pub feeds_opml: Option<PathBuf>,
    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,
    /// `[feeds]` merged with the optional OPML list, filled in by `load`.
    #[serde(skip)]
    pub sources: Vec<FeedSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; the SMTP username when absent.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: None,
            to: String::new(),
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

impl SmtpSettings {
    pub fn sender(&self) -> &str {
        self.from
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.username.trim())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestSettings {
    pub max_articles: usize,
    pub max_age_hours: u32,
    pub keywords: Vec<String>,
    pub subject_prefix: String,
    pub title: String,
    pub tagline: String,
    /// Language the generated newsletter is written in.
    pub language: String,
    pub prompt_summary_chars: usize,
    pub fallback_summary_chars: usize,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            max_articles: 10,
            max_age_hours: 24,
            keywords: Vec::new(),
            subject_prefix: "Privacy Newsletter".to_string(),
            title: "Privacy News".to_string(),
            tagline: "What happened in the privacy world today".to_string(),
            language: "English".to_string(),
            prompt_summary_chars: 500,
            fallback_summary_chars: 400,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

fn default_feed_timeout_secs() -> u64 {
    20
}

impl Config {
    /// Reads, completes and validates the configuration. Any error here is fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content, path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.resolve_sources(path.parent().unwrap_or_else(|| Path::new(".")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `.env.local` into the process environment. Real env vars take precedence.
    pub fn load_env_file() {
        match dotenvy::from_filename(ENV_FILE) {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
            Err(error) if error.not_found() => {}
            Err(error) => tracing::warn!(error = %error, "ignoring unreadable env file"),
        }
    }

    fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(value) = lookup(ENV_LLM_API_KEY) {
            self.llm.api_key = value;
        }
        if let Some(value) = lookup(ENV_SMTP_USERNAME) {
            self.smtp.username = value;
        }
        if let Some(value) = lookup(ENV_SMTP_PASSWORD) {
            self.smtp.password = value;
        }
        if let Some(value) = lookup(ENV_RECIPIENT) {
            self.smtp.to = value;
        }
    }

    fn resolve_sources(&mut self, base_dir: &Path) -> Result<(), ConfigError> {
        let imported = match &self.feeds_opml {
            Some(opml_path) => {
                let path = base_dir.join(opml_path);
                let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                parse_opml(&content).map_err(|source| ConfigError::Import { path, source })?
            }
            None => Vec::new(),
        };
        self.sources = merge_sources(&self.feeds, imported);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if self.llm.api_key.trim().is_empty() {
            missing.push(format!("llm.api_key (or {ENV_LLM_API_KEY})"));
        } else if let Err(error) = validate_config(&self.llm) {
            missing.push(format!("llm: {error}"));
        }

        if self.smtp.host.trim().is_empty() {
            missing.push("smtp.host".to_string());
        }
        if self.smtp.port == 0 {
            missing.push("smtp.port must be non-zero".to_string());
        }
        if self.smtp.username.trim().is_empty() {
            missing.push(format!("smtp.username (or {ENV_SMTP_USERNAME})"));
        }
        if self.smtp.password.trim().is_empty() {
            missing.push(format!("smtp.password (or {ENV_SMTP_PASSWORD})"));
        }
        if self.smtp.to.trim().is_empty() {
            missing.push(format!("smtp.to (or {ENV_RECIPIENT})"));
        } else if self.smtp.to.trim().parse::<Mailbox>().is_err() {
            missing.push(format!("smtp.to is not a valid address: {:?}", self.smtp.to));
        }
        let sender = self.smtp.sender();
        if !sender.is_empty() && sender.parse::<Mailbox>().is_err() {
            missing.push(format!("smtp.from is not a valid address: {sender:?}"));
        }

        if self.digest.max_articles == 0 {
            missing.push("digest.max_articles must be at least 1".to_string());
        }
        if self.digest.max_age_hours == 0 {
            missing.push("digest.max_age_hours must be at least 1".to_string());
        }
        if self.digest.keywords.iter().all(|keyword| keyword.trim().is_empty()) {
            missing.push("digest.keywords (at least one keyword)".to_string());
        }
        if self.sources.is_empty() {
            missing.push("feeds (at least one [feeds] entry or a feeds_opml file)".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Incomplete { missing })
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
