//! Microsoft Translator, authenticated with short-lived bearer tokens

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::batch;
use crate::core::config::{ExecutionConfig, ServiceConfig};
use crate::core::credential::{CredentialHolder, CredentialManager};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ConcurrencyStrategy, Credential, Engine, SourceText, Translations};
use crate::core::worker::WorkerJob;
use crate::languages;

/// Microsoft translator
#[derive(Debug, Clone)]
pub struct MicrosoftEngine {
    client: reqwest::Client,
    service: ServiceConfig,
    execution: ExecutionConfig,
    credentials: CredentialManager,
}

impl MicrosoftEngine {
    pub fn new(client: reqwest::Client, service: ServiceConfig) -> Self {
        let credentials = CredentialManager::new(client.clone(), &service);
        Self {
            client,
            service,
            execution: ExecutionConfig::default(),
            credentials,
        }
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Translate one item, signing the request with `credential`.
    ///
    /// The credential must still be live; refreshing is the caller's job.
    pub async fn translate_one(
        &self,
        text: &SourceText,
        lang_to: &str,
        lang_from: &str,
        credential: &Credential,
    ) -> Result<String> {
        languages::ensure_supported(Engine::Microsoft, &[lang_to, lang_from])?;

        if credential.is_expired() {
            return Err(TranslationError::CredentialExpired {
                expired_at: credential.expires_at,
            });
        }

        let text = text.joined();
        debug!("Microsoft {} -> {}: {} chars", lang_from, lang_to, text.len());

        let response = self
            .client
            .get(&self.service.microsoft_translate_url)
            .timeout(Duration::from_millis(self.service.timeout_ms))
            .bearer_auth(&credential.token)
            .query(&[("text", &*text), ("to", lang_to), ("from", lang_from)])
            .send()
            .await
            .map_err(TranslationError::network)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(TranslationError::invalid_response)?;

        Ok(parse_bare_text(&body))
    }

    /// Translate every item; failed items come back as `None` in their position.
    ///
    /// One token is acquired up front and its failure aborts the batch. Each item
    /// then refreshes the shared token if it has expired.
    pub async fn translate_many(
        &self,
        items: Vec<SourceText>,
        lang_to: &str,
        lang_from: &str,
        key: &str,
        strategy: ConcurrencyStrategy,
    ) -> Result<Translations> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        if let Err(e) = languages::ensure_supported(Engine::Microsoft, &[lang_to, lang_from]) {
            warn!("{}; every item of the batch is missing", e);
            return Ok(vec![None; items.len()]);
        }

        let initial = self.credentials.acquire(key).await?;
        self.fan_out(items, lang_to, lang_from, key, initial, strategy)
            .await
    }

    /// Run the batch starting from `initial`, which items refresh on expiry
    async fn fan_out(
        &self,
        items: Vec<SourceText>,
        lang_to: &str,
        lang_from: &str,
        key: &str,
        initial: Arc<Credential>,
        strategy: ConcurrencyStrategy,
    ) -> Result<Translations> {
        let holder = CredentialHolder::new(initial.clone());

        let jobs = WorkerJob::for_batch(
            Engine::Microsoft,
            items,
            lang_to,
            lang_from,
            key,
            Some(&initial),
            &self.service,
        );

        let engine = self.clone();
        let outcomes = batch::execute(strategy, &self.execution, jobs, move |job| {
            let engine = engine.clone();
            let holder = holder.clone();
            async move {
                let credential = holder.refresh(&engine.credentials, &job.key).await?;
                engine
                    .translate_one(
                        &job.request.text,
                        &job.request.target_lang,
                        &job.request.source_lang,
                        &credential,
                    )
                    .await
            }
        })
        .await?;

        Ok(batch::collate(Engine::Microsoft, outcomes))
    }
}

/// Unwrap a `<string>` serialization element if present and decode its entities
fn parse_bare_text(body: &str) -> String {
    let Some(rest) = body.trim().strip_prefix("<string") else {
        return body.to_string();
    };
    if !(rest.starts_with('>') || rest.starts_with('/') || rest.starts_with(char::is_whitespace)) {
        return body.to_string();
    }

    // <string xmlns="..."/> is an empty translation
    if let Some(attributes) = rest.strip_suffix("/>") {
        if !attributes.contains('>') {
            return String::new();
        }
    }

    match rest
        .strip_suffix("</string>")
        .and_then(|rest| rest.split_once('>'))
    {
        Some((_, inner)) => unescape_xml(inner),
        None => body.to_string(),
    }
}

/// Single pass, so `&amp;lt;` decodes to `&lt;`
fn unescape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
