//! Google Cloud Translation v2, authenticated with an API key

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::batch;
use crate::core::config::{ExecutionConfig, ServiceConfig};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ConcurrencyStrategy, Engine, SourceText, Translations};
use crate::core::worker::WorkerJob;
use crate::languages;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
}

/// Google translator
#[derive(Debug, Clone)]
pub struct GoogleEngine {
    client: reqwest::Client,
    service: ServiceConfig,
    execution: ExecutionConfig,
}

impl GoogleEngine {
    pub fn new(client: reqwest::Client, service: ServiceConfig) -> Self {
        Self {
            client,
            service,
            execution: ExecutionConfig::default(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    /// Translate one item with `key` sent as the query credential
    pub async fn translate_one(
        &self,
        text: &SourceText,
        lang_to: &str,
        lang_from: &str,
        key: &str,
    ) -> Result<String> {
        languages::ensure_supported(Engine::Google, &[lang_to, lang_from])?;

        let text = text.joined();
        debug!("Google {} -> {}: {} chars", lang_from, lang_to, text.len());

        let response = self
            .client
            .post(&self.service.google_translate_url)
            .timeout(Duration::from_millis(self.service.timeout_ms))
            .query(&[("key", key)])
            .form(&[
                ("q", &*text),
                ("target", lang_to),
                ("source", lang_from),
                ("format", "text"),
            ])
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

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(TranslationError::invalid_response)?;

        body.data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| TranslationError::InvalidResponseError {
                message: "No translation in response".to_string(),
            })
    }

    /// Translate every item; failed items come back as `None` in their position
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

        if let Err(e) = languages::ensure_supported(Engine::Google, &[lang_to, lang_from]) {
            warn!("{}; every item of the batch is missing", e);
            return Ok(vec![None; items.len()]);
        }

        let jobs = WorkerJob::for_batch(
            Engine::Google,
            items,
            lang_to,
            lang_from,
            key,
            None,
            &self.service,
        );

        let engine = self.clone();
        let outcomes = batch::execute(strategy, &self.execution, jobs, move |job| {
            let engine = engine.clone();
            async move {
                engine
                    .translate_one(
                        &job.request.text,
                        &job.request.target_lang,
                        &job.request.source_lang,
                        &job.key,
                    )
                    .await
            }
        })
        .await?;

        Ok(batch::collate(Engine::Google, outcomes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string_contains, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn engine_for(server: &MockServer) -> GoogleEngine {
        let service = ServiceConfig {
            google_translate_url: format!("{}/language/translate/v2", server.uri()),
            ..Default::default()
        };
        GoogleEngine::new(reqwest::Client::new(), service)
    }

    fn translation(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [{"translatedText": text}]}
        }))
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_expose_key() {
        let service = ServiceConfig {
            google_translate_url: "http://127.0.0.1:1/language/translate/v2".to_string(),
            ..Default::default()
        };
        let err = GoogleEngine::new(reqwest::Client::new(), service)
            .translate_one(&"Hello".into(), "es", "en", "SECRET-API-KEY")
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::NetworkError { .. }));
        assert!(!err.to_string().contains("SECRET-API-KEY"));
    }

    #[tokio::test]
    async fn test_translate_one_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/language/translate/v2"))
            .and(query_param("key", "g-key"))
            .and(body_string_contains("q=Hello"))
            .and(body_string_contains("target=es"))
            .and(body_string_contains("source=en"))
            .respond_with(translation("Hola"))
            .expect(1)
            .mount(&server)
            .await;

        let result = engine_for(&server)
            .translate_one(&"Hello".into(), "es", "en", "g-key")
            .await
            .unwrap();

        assert_eq!(result, "Hola");
    }

    #[tokio::test]
    async fn test_translate_one_joins_lines() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("q=Good+morning%0AGood+night"))
            .respond_with(translation("Buenos días\nBuenas noches"))
            .expect(1)
            .mount(&server)
            .await;

        let text = SourceText::from(vec!["Good morning", "Good night"]);
        let result = engine_for(&server)
            .translate_one(&text, "es", "en", "g-key")
            .await
            .unwrap();

        assert_eq!(result, "Buenos días\nBuenas noches");
    }

    #[tokio::test]
    async fn test_translate_one_api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = engine_for(&server)
            .translate_one(&"Hello".into(), "es", "en", "bad")
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::ApiError { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_translate_one_empty_translations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"translations": []}})),
            )
            .mount(&server)
            .await;

        let err = engine_for(&server)
            .translate_one(&"Hello".into(), "es", "en", "g-key")
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::InvalidResponseError { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_language_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(translation("unused"))
            .expect(0)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine
            .translate_one(&"Hello".into(), "zz", "en", "g-key")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::UnsupportedLanguage { .. }));

        let batch = engine
            .translate_many(
                vec!["Hello".into(), "Goodbye".into()],
                "zz",
                "en",
                "g-key",
                ConcurrencyStrategy::LocalParallel,
            )
            .await
            .unwrap();
        assert_eq!(batch, vec![None, None]);
    }

    #[tokio::test]
    async fn test_translate_many_downgrades_failed_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("q=Hello"))
            .respond_with(translation("Hola"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("q=Goodbye"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let results = engine_for(&server)
            .translate_many(
                vec!["Hello".into(), "Goodbye".into()],
                "es",
                "en",
                "g-key",
                ConcurrencyStrategy::Sequential,
            )
            .await
            .unwrap();

        assert_eq!(results, vec![Some("Hola".to_string()), None]);
    }

    #[tokio::test]
    async fn test_translate_many_empty_input() {
        let server = MockServer::start().await;
        let results = engine_for(&server)
            .translate_many(vec![], "es", "en", "g-key", ConcurrencyStrategy::Sequential)
            .await
            .unwrap();

        assert!(results.is_empty());
    }
}
