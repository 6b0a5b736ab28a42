//! HTTP translation service provider
//!
//! Talks to a translation server that accepts
//! `{"text": ..., "from": ..., "to": ...}` as a JSON POST body and answers with
//! a JSON object carrying the result in `translationText`.
//!
//! # Example
//!
//! ```ignore
//! use patch_translator::mt::{HttpTranslator, MachineTranslator};
//!
//! let provider = HttpTranslator::new("http://127.0.0.1:3000/api/translate", 30)?;
//! let result = provider.translate("今日は", "ja", "en").await?;
//! ```

use crate::mt::error::{MtError, MtResult};
use crate::mt::translator::{MachineTranslator, validate_locale};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translationText", default)]
    translation_text: String,
}

/// Translation server reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    /// HTTP client for async requests
    client: reqwest::Client,
    /// Full URL of the translate endpoint
    endpoint: String,
}

impl HttpTranslator {
    /// Create a provider for `endpoint` with a per-request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(MtError)` - If the endpoint is not an http(s) URL or the client
    ///   cannot be built
    pub fn new(endpoint: &str, timeout_secs: u64) -> MtResult<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(MtError::ConfigError("Endpoint cannot be empty".to_string()));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(MtError::ConfigError(format!(
                "Endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MtError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MachineTranslator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        if text.is_empty() {
            return Ok(String::new());
        }

        let body = json!({
            "text": text,
            "from": source_locale,
            "to": target_locale,
        });

        // Transport failures convert to ServiceUnavailable
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(match status {
                StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT => {
                    MtError::ServiceUnavailable(format!("{}: {}", status, error_text))
                }
                s if s.is_client_error() => {
                    MtError::ConfigError(format!("Service rejected request ({}): {}", s, error_text))
                }
                s => MtError::TranslationError(format!("Service error ({}): {}", s, error_text)),
            });
        }

        let reply: TranslateResponse = response.json().await.map_err(|e| {
            MtError::TranslationError(format!("Failed to parse service response: {}", e))
        })?;

        Ok(reply.translation_text)
    }

    fn provider_name(&self) -> &str {
        "HTTP Translator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Initialization Tests ==========

    #[test]
    fn test_new_with_valid_endpoint() {
        let provider = HttpTranslator::new("http://127.0.0.1:3000/api/translate", 30);
        assert!(provider.is_ok());
        let provider = provider.unwrap();
        assert_eq!(provider.provider_name(), "HTTP Translator");
        assert_eq!(provider.endpoint(), "http://127.0.0.1:3000/api/translate");
    }

    #[test]
    fn test_new_with_empty_endpoint() {
        match HttpTranslator::new("  ", 30) {
            Err(MtError::ConfigError(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected ConfigError"),
        }
    }

    #[test]
    fn test_new_with_bad_scheme() {
        assert!(HttpTranslator::new("ftp://127.0.0.1/translate", 30).is_err());
        assert!(HttpTranslator::new("127.0.0.1:3000", 30).is_err());
    }

    // ========== Validation Tests ==========

    #[tokio::test]
    async fn test_translate_empty_text() {
        let provider = HttpTranslator::new("http://127.0.0.1:1/translate", 1).unwrap();
        let result = provider.translate("", "ja", "en").await.unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_translate_invalid_locale() {
        let provider = HttpTranslator::new("http://127.0.0.1:1/translate", 1).unwrap();
        let result = provider.translate("今日は", "ja@", "en").await;
        assert!(matches!(result, Err(MtError::InvalidLocale(_))));
    }

    // ========== Outage Tests ==========

    #[tokio::test]
    async fn test_unreachable_service_is_fatal() {
        let provider = HttpTranslator::new("http://127.0.0.1:1/translate", 2).unwrap();
        let err = provider.translate("今日は", "ja", "en").await.unwrap_err();
        assert!(err.is_fatal(), "unexpected error: {}", err);
    }

    // ========== Integration Tests (require a running service) ==========

    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_real_service_translation() {
        let provider = HttpTranslator::new("http://127.0.0.1:3000/api/translate", 30).unwrap();
        let result = provider.translate("今日は", "ja", "en").await.unwrap();
        println!("Translation: 今日は → {}", result);
        assert!(!result.is_empty());
    }
}
