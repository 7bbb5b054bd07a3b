//! Caller-facing translator: key resolution and engine dispatch

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{
    ConcurrencyStrategy, Engine, SourceText, Translations, DEFAULT_SOURCE_LANG,
};
use crate::engines::{GoogleEngine, MicrosoftEngine};

/// Translator over both engines, sharing one HTTP client
#[derive(Debug, Clone)]
pub struct Translator {
    config: Arc<TranslatorConfig>,
    google: GoogleEngine,
    microsoft: MicrosoftEngine,
}

impl Translator {
    /// Create a new translator
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.service.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let google = GoogleEngine::new(client.clone(), config.service.clone())
            .with_execution(config.execution.clone());
        let microsoft = MicrosoftEngine::new(client, config.service.clone())
            .with_execution(config.execution.clone());

        Ok(Self {
            config: Arc::new(config),
            google,
            microsoft,
        })
    }

    /// Create from the config file and environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::load()?;
        Self::new(config)
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn google(&self) -> &GoogleEngine {
        &self.google
    }

    pub fn microsoft(&self) -> &MicrosoftEngine {
        &self.microsoft
    }

    /// Explicit key wins over the configured one
    fn resolve_key(&self, engine: Engine, key: Option<&str>) -> Result<String> {
        key.or_else(|| self.config.key_for(engine))
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| TranslationError::MissingApiKey {
                engine: engine.to_string(),
                env_var: engine.key_env_var().to_string(),
            })
    }

    /// Translate with Google. `lang_from` defaults to English.
    pub async fn translate_google<I>(
        &self,
        texts: I,
        lang_to: &str,
        lang_from: Option<&str>,
        key: Option<&str>,
        strategy: ConcurrencyStrategy,
    ) -> Result<Translations>
    where
        I: IntoIterator,
        I::Item: Into<SourceText>,
    {
        self.translate_with(Engine::Google, texts, lang_to, lang_from, key, strategy)
            .await
    }

    /// Translate with Microsoft. `lang_from` defaults to English.
    pub async fn translate_microsoft<I>(
        &self,
        texts: I,
        lang_to: &str,
        lang_from: Option<&str>,
        key: Option<&str>,
        strategy: ConcurrencyStrategy,
    ) -> Result<Translations>
    where
        I: IntoIterator,
        I::Item: Into<SourceText>,
    {
        self.translate_with(Engine::Microsoft, texts, lang_to, lang_from, key, strategy)
            .await
    }

    /// Translate with the engine named `engine_name`; an unknown name fails before any request
    pub async fn translate<I>(
        &self,
        texts: I,
        lang_to: &str,
        lang_from: Option<&str>,
        key: Option<&str>,
        strategy: ConcurrencyStrategy,
        engine_name: &str,
    ) -> Result<Translations>
    where
        I: IntoIterator,
        I::Item: Into<SourceText>,
    {
        let engine: Engine = engine_name.parse()?;
        self.translate_with(engine, texts, lang_to, lang_from, key, strategy)
            .await
    }

    /// Translate with `engine`
    pub async fn translate_with<I>(
        &self,
        engine: Engine,
        texts: I,
        lang_to: &str,
        lang_from: Option<&str>,
        key: Option<&str>,
        strategy: ConcurrencyStrategy,
    ) -> Result<Translations>
    where
        I: IntoIterator,
        I::Item: Into<SourceText>,
    {
        let key = self.resolve_key(engine, key)?;
        let items: Vec<SourceText> = texts.into_iter().map(Into::into).collect();
        let lang_from = lang_from.unwrap_or(DEFAULT_SOURCE_LANG);

        debug!(
            "Dispatching {} items to {} ({} -> {})",
            items.len(),
            engine,
            lang_from,
            lang_to
        );

        match engine {
            Engine::Google => {
                self.google
                    .translate_many(items, lang_to, lang_from, &key, strategy)
                    .await
            }
            Engine::Microsoft => {
                self.microsoft
                    .translate_many(items, lang_to, lang_from, &key, strategy)
                    .await
            }
        }
    }
}
