//! Configuration management

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::models::Engine;

pub const DEFAULT_GOOGLE_TRANSLATE_URL: &str =
    "https://translation.googleapis.com/language/translate/v2";
pub const DEFAULT_MICROSOFT_AUTH_URL: &str =
    "https://api.cognitive.microsoft.com/sts/v1.0/issueToken";
pub const DEFAULT_MICROSOFT_TRANSLATE_URL: &str =
    "https://api.microsofttranslator.com/V2/Http.svc/Translate";

/// Upstream endpoints and token timing. Shipped to distributed workers with every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub google_translate_url: String,
    pub microsoft_auth_url: String,
    pub microsoft_translate_url: String,
    /// Lifetime the authentication service grants a token
    pub token_lifetime_secs: u64,
    /// Shaved off the lifetime so a token is never used right at its expiry
    pub token_safety_margin_secs: u64,
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            google_translate_url: DEFAULT_GOOGLE_TRANSLATE_URL.to_string(),
            microsoft_auth_url: DEFAULT_MICROSOFT_AUTH_URL.to_string(),
            microsoft_translate_url: DEFAULT_MICROSOFT_TRANSLATE_URL.to_string(),
            token_lifetime_secs: 600,
            token_safety_margin_secs: 60,
            timeout_ms: 30000,
        }
    }
}

impl ServiceConfig {
    /// How long a freshly acquired token is treated as valid
    pub fn token_validity(&self) -> chrono::Duration {
        let secs = self
            .token_lifetime_secs
            .saturating_sub(self.token_safety_margin_secs);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

/// Fan-out settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Parallel tasks for local-parallel, worker processes for distributed
    pub max_workers: usize,
    /// Program launched for distributed workers; the current executable when unset
    pub worker_program: Option<PathBuf>,
    pub worker_args: Vec<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            worker_program: None,
            worker_args: vec!["worker".to_string()],
        }
    }
}

/// Configuration for translator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub google_api_key: Option<String>,
    pub microsoft_subscription_key: Option<String>,
    pub service: ServiceConfig,
    pub execution: ExecutionConfig,
}

/// Names the config file `load` reads before applying the environment
pub const CONFIG_PATH_ENV: &str = "DUO_TRANSLATOR_CONFIG";

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {}", name, raw))
        })
        .transpose()
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load the optional config file, then let the environment override it
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match env_var(CONFIG_PATH_ENV) {
            Some(path) => {
                info!("Loading configuration from {}", path);
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Some(key) = env_var(Engine::Google.key_env_var()) {
            self.google_api_key = Some(key);
        }
        if let Some(key) = env_var(Engine::Microsoft.key_env_var()) {
            self.microsoft_subscription_key = Some(key);
        }
        if let Some(url) = env_var("GOOGLE_TRANSLATE_URL") {
            self.service.google_translate_url = url;
        }
        if let Some(url) = env_var("MICROSOFT_AUTH_URL") {
            self.service.microsoft_auth_url = url;
        }
        if let Some(url) = env_var("MICROSOFT_TRANSLATE_URL") {
            self.service.microsoft_translate_url = url;
        }
        if let Some(secs) = env_parse("TOKEN_LIFETIME_SECS")? {
            self.service.token_lifetime_secs = secs;
        }
        if let Some(secs) = env_parse("TOKEN_SAFETY_MARGIN_SECS")? {
            self.service.token_safety_margin_secs = secs;
        }
        if let Some(ms) = env_parse("REQUEST_TIMEOUT_MS")? {
            self.service.timeout_ms = ms;
        }
        if let Some(workers) = env_parse("MAX_WORKERS")? {
            self.execution.max_workers = workers;
        }
        if let Some(program) = env_var("WORKER_PROGRAM") {
            self.execution.worker_program = Some(PathBuf::from(program));
        }
        Ok(())
    }

    /// Load from a JSON or YAML file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let service = &self.service;
        for (name, url) in [
            ("google_translate_url", &service.google_translate_url),
            ("microsoft_auth_url", &service.microsoft_auth_url),
            ("microsoft_translate_url", &service.microsoft_translate_url),
        ] {
            if url.is_empty() {
                return Err(anyhow::anyhow!("{} is required", name));
            }
        }

        if service.token_safety_margin_secs >= service.token_lifetime_secs {
            return Err(anyhow::anyhow!(
                "token_safety_margin_secs ({}) must be less than token_lifetime_secs ({})",
                service.token_safety_margin_secs,
                service.token_lifetime_secs
            ));
        }

        if self.execution.max_workers == 0 {
            return Err(anyhow::anyhow!("max_workers must be greater than 0"));
        }

        if self.google_api_key.is_none() && self.microsoft_subscription_key.is_none() {
            warn!("No engine keys configured; keys must be passed per call");
        }

        Ok(())
    }

    /// Key configured for an engine
    pub fn key_for(&self, engine: Engine) -> Option<&str> {
        match engine {
            Engine::Google => self.google_api_key.as_deref(),
            Engine::Microsoft => self.microsoft_subscription_key.as_deref(),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "yaml" || ext == "yml"
        })
        .unwrap_or(false)
}
