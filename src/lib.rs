//! duo-translator - batch translation through Google or Microsoft
//!
//! Sends many texts to one of two translation services and returns the
//! results in input order. Items run sequentially, as parallel tokio tasks, or
//! on a pool of worker processes; an item that fails comes back as `None`
//! instead of failing the batch. The Microsoft engine's short-lived access
//! token is acquired once per batch and refreshed by whichever item finds it
//! expired.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod engines;
pub mod languages;

// Re-export key types for convenience
pub use crate::core::{
    client::Translator,
    config::{ExecutionConfig, ServiceConfig, TranslatorConfig},
    credential::{CredentialHolder, CredentialManager},
    errors::{Result, TranslationError},
    models::{ConcurrencyStrategy, Credential, Engine, SourceText, TranslationRequest, Translations},
};

pub use crate::engines::{GoogleEngine, MicrosoftEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
