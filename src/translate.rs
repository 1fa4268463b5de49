//! Machine translation client and paragraph chunking
//!
//! A single [`Translate::translate`] call is fallible and transient failures
//! are expected; the retry policy in [`crate::retry`] wraps it. Texts longer
//! than the configured chunk size are split on paragraph boundaries and
//! translated chunk by chunk, then rejoined, so paragraph structure survives
//! translation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Translation endpoint of the hosted API
const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// A translation service
///
/// Implementations translate one piece of text per call. Callers are
/// responsible for chunking (see [`translate_chunked`]) and for retrying
/// transient failures.
#[async_trait]
pub trait Translate: Send + Sync {
    /// Translate `text` from `source_lang` to `target_lang`
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str)
    -> Result<String>;
}

/// Client for the Google Cloud Translation REST API (v2, API-key auth)
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl GoogleTranslator {
    /// Create a client using the hosted endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    /// Create a client against a specific endpoint (used by tests)
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Translate for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "q": text,
                "source": source_lang,
                "target": target_lang,
                "format": "text",
            }))
            .send()
            .await
            .map_err(|e| Error::Translation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Translation(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| Error::Translation(format!("malformed response: {e}")))?;

        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| Error::Translation("response carried no translations".into()))
    }
}

/// Translate a text of any length, chunking at paragraph boundaries
///
/// Texts at or under `max_chunk_chars` go out as one request. Longer texts
/// are split with [`chunk_text`] and the translated chunks are rejoined with
/// blank lines. Any chunk failing fails the whole call.
pub async fn translate_chunked(
    translator: &dyn Translate,
    text: &str,
    source_lang: &str,
    target_lang: &str,
    max_chunk_chars: usize,
) -> Result<String> {
    if text.chars().count() <= max_chunk_chars {
        return translator.translate(text, source_lang, target_lang).await;
    }

    let chunks = chunk_text(text, max_chunk_chars);
    let mut translated = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        translated.push(translator.translate(chunk, source_lang, target_lang).await?);
    }
    Ok(translated.join("\n\n"))
}

/// Split text into chunks of at most `max_chars` characters, breaking only
/// at paragraph boundaries (blank lines)
///
/// A single paragraph longer than `max_chars` becomes its own chunk rather
/// than being split mid-paragraph.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for para in text.split("\n\n") {
        let para_len = para.chars().count();
        if current_len + para_len > max_chars && !current.is_empty() {
            chunks.push(current.join("\n\n"));
            current = vec![para];
            current_len = para_len;
        } else {
            current.push(para);
            current_len += para_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    chunks
}
