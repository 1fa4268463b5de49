//! Configuration types for novel-sync

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Crawl pacing and windowing configuration
///
/// Groups settings that bound how much work a single run performs and how
/// aggressively it hits the source site and the backend.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum chapters processed per novel per run (default: 5)
    ///
    /// A run never processes more than this many chapters for one novel,
    /// which lets an external scheduler rate-limit long backfills. The
    /// ledger keeps the novel `in_progress` so the next run resumes where
    /// this one stopped.
    #[serde(default = "default_max_chapters_per_run")]
    pub max_chapters_per_run: u32,

    /// Delay inserted between remote calls and between publish batches (default: 2 seconds)
    #[serde(default = "default_request_delay", with = "duration_serde")]
    pub request_delay: Duration,

    /// Chapters per bulk-create request (default: 50)
    #[serde(default = "default_bulk_chapter_size")]
    pub bulk_chapter_size: usize,

    /// Maximum collection pages visited in one run (None = walk to the last page)
    #[serde(default)]
    pub max_pages: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_chapters_per_run: default_max_chapters_per_run(),
            request_delay: default_request_delay(),
            bulk_chapter_size: default_bulk_chapter_size(),
            max_pages: None,
        }
    }
}

/// Translation configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Enable machine translation of titles, descriptions, and chapter content
    #[serde(default)]
    pub enabled: bool,

    /// Source language code (default: "zh-CN")
    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    /// Target language code (default: "en")
    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Maximum characters per translation request before paragraph chunking (default: 5000)
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Translation API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Retry policy for transient translation failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            max_chunk_chars: default_max_chunk_chars(),
            api_key: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient translation failures
///
/// The delay before attempt `i + 1` is `min(max_delay, 2^i)` seconds. With
/// the defaults a chapter is attempted 10 times over roughly 8.5 minutes of
/// accumulated backoff before the run reports a terminal translation failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempt count, including the first (default: 10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Cap on the backoff delay between attempts (default: 600 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Add random jitter to delays (default: false)
    ///
    /// Jitter spreads concurrent clients apart but makes total elapsed
    /// backoff nondeterministic; it stays off unless the deployment runs
    /// several crawlers against the same translation quota.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_delay: default_max_delay(),
            jitter: false,
        }
    }
}

/// Publishing backend (CMS REST API) configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the CMS, e.g. `https://example.com`
    pub base_url: String,

    /// API key sent as the `X-API-Key` header
    #[serde(default)]
    pub api_key: String,

    /// Timeout for health and existence checks (default: 10 seconds)
    #[serde(default = "default_check_timeout", with = "duration_serde")]
    pub check_timeout: Duration,

    /// Timeout for story/chapter create calls (default: 30 seconds)
    #[serde(default = "default_create_timeout", with = "duration_serde")]
    pub create_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            check_timeout: default_check_timeout(),
            create_timeout: default_create_timeout(),
        }
    }
}

/// Local storage configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding per-novel content (default: "./novels")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path of the durable progress ledger (default: "./crawler_state.json")
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_path: default_ledger_path(),
        }
    }
}

/// Main configuration for [`NovelSync`](crate::sync::NovelSync)
///
/// Fields are organized into logical sub-configs:
/// - [`crawl`](CrawlConfig) - run windowing, pacing, batch sizing
/// - [`translation`](TranslationConfig) - languages, chunking, retry policy
/// - [`backend`](BackendConfig) - CMS endpoint and timeouts
/// - [`storage`](StorageConfig) - content directory and ledger path
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Run windowing and pacing settings
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Publishing backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Validate the configuration before constructing a pipeline
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.is_empty() {
            return Err(Error::Config {
                message: "backend base URL must be set".into(),
                key: Some("backend.base_url".into()),
            });
        }
        if self.crawl.bulk_chapter_size == 0 {
            return Err(Error::Config {
                message: "bulk chapter size must be at least 1".into(),
                key: Some("crawl.bulk_chapter_size".into()),
            });
        }
        if self.crawl.max_chapters_per_run == 0 {
            return Err(Error::Config {
                message: "max chapters per run must be at least 1".into(),
                key: Some("crawl.max_chapters_per_run".into()),
            });
        }
        if self.translation.enabled && self.translation.api_key.is_none() {
            return Err(Error::Config {
                message: "translation is enabled but no API key is configured".into(),
                key: Some("translation.api_key".into()),
            });
        }
        Ok(())
    }
}

fn default_max_chapters_per_run() -> u32 {
    5
}

fn default_request_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_bulk_chapter_size() -> usize {
    50
}

fn default_source_lang() -> String {
    "zh-CN".into()
}

fn default_target_lang() -> String {
    "en".into()
}

fn default_max_chunk_chars() -> usize {
    5000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_max_delay() -> Duration {
    Duration::from_secs(600)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_create_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./novels")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("./crawler_state.json")
}

// Duration serialization helper (seconds as integers)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
