//! Core data models for translation

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::core::errors::TranslationError;

/// Source language used when the caller does not name one
pub const DEFAULT_SOURCE_LANG: &str = "en";

/// Supported translation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Google Cloud Translation v2, authenticated with an API key
    Google,
    /// Microsoft Translator, authenticated with a short-lived bearer token
    Microsoft,
}

impl Engine {
    /// Every supported engine
    pub const ALL: [Engine; 2] = [Engine::Google, Engine::Microsoft];

    /// Environment variable holding this engine's key
    pub fn key_env_var(&self) -> &'static str {
        match self {
            Engine::Google => "GOOGLE_TRANSLATE_API_KEY",
            Engine::Microsoft => "MICROSOFT_TRANSLATOR_KEY",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Google => write!(f, "google"),
            Engine::Microsoft => write!(f, "microsoft"),
        }
    }
}

impl FromStr for Engine {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Engine::Google),
            "microsoft" => Ok(Engine::Microsoft),
            _ => Err(TranslationError::UnknownEngine {
                name: s.to_string(),
            }),
        }
    }
}

/// How a batch fans its items out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyStrategy {
    /// One item at a time on the calling task
    #[default]
    Sequential,
    /// Tokio tasks across the runtime's worker threads
    LocalParallel,
    /// A pool of worker processes fed over stdin/stdout
    Distributed,
}

impl fmt::Display for ConcurrencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyStrategy::Sequential => write!(f, "sequential"),
            ConcurrencyStrategy::LocalParallel => write!(f, "local-parallel"),
            ConcurrencyStrategy::Distributed => write!(f, "distributed"),
        }
    }
}

impl FromStr for ConcurrencyStrategy {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ConcurrencyStrategy::Sequential),
            "local-parallel" | "parallel" => Ok(ConcurrencyStrategy::LocalParallel),
            "distributed" => Ok(ConcurrencyStrategy::Distributed),
            other => Err(TranslationError::ConfigError {
                message: format!(
                    "unknown concurrency strategy '{}' (expected sequential, local-parallel or distributed)",
                    other
                ),
            }),
        }
    }
}

/// Text of one logical item: a single string or several lines sent together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceText {
    Single(String),
    Lines(Vec<String>),
}

impl SourceText {
    /// Text as sent upstream, lines joined with `\n`
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            SourceText::Single(text) => Cow::Borrowed(text),
            SourceText::Lines(lines) => Cow::Owned(lines.join("\n")),
        }
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        SourceText::Single(text)
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        SourceText::Single(text.to_string())
    }
}

impl From<Vec<String>> for SourceText {
    fn from(lines: Vec<String>) -> Self {
        SourceText::Lines(lines)
    }
}

impl From<Vec<&str>> for SourceText {
    fn from(lines: Vec<&str>) -> Self {
        SourceText::Lines(lines.into_iter().map(str::to_string).collect())
    }
}

/// Translation request for a single item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: SourceText,
    pub target_lang: String,
    pub source_lang: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<SourceText>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
        }
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }
}

/// Short-lived bearer token for the Microsoft engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Token valid from now for `valid_for`
    pub fn new(token: impl Into<String>, valid_for: Duration) -> Self {
        Self {
            token: token.into(),
            expires_at: Utc::now() + valid_for,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Ordered batch output; `None` marks an item whose translation failed
pub type Translations = Vec<Option<String>>;

/// Count sentinel entries in a batch result
pub fn missing_count(results: &[Option<String>]) -> usize {
    results.iter().filter(|r| r.is_none()).count()
}
