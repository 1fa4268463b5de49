//! Publishing backend client
//!
//! [`PublishingBackend`] is the trait contract the orchestrators and the
//! publisher work against; [`HttpBackend`] talks to the CMS plugin's REST
//! routes under `/wp-json/crawler/v1/`.
//!
//! Two calls deliberately swallow errors instead of returning them:
//! `chapter_status` answers [`ChapterExistence::Unavailable`] and
//! `chapter_exists` answers `false` when the backend cannot be asked. Both
//! degrade toward doing more work rather than skipping work, which keeps
//! re-runs safe. Bulk creates do surface errors, because the publisher needs
//! the failure to trigger its per-chapter fallback.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::types::{ChapterExistence, PreparedChapter, PublishTally, StoryRecord};

/// Backend health report
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HealthInfo {
    /// Reported status string, e.g. "ok"
    #[serde(default)]
    pub status: String,
    /// Plugin version, when the backend reports one
    #[serde(default)]
    pub version: Option<String>,
}

/// Result of the idempotent story create-or-fetch call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoryHandle {
    /// Backend story ID
    pub id: u64,
    /// True when the story already existed and nothing was created
    pub existed: bool,
}

/// Result of an individual chapter create call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatedChapter {
    /// Backend chapter ID
    pub id: u64,
    /// True when the chapter already existed and nothing was created
    pub existed: bool,
}

/// Counts reported by a successful bulk chapter create
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BulkOutcome {
    /// Chapters newly created
    #[serde(default)]
    pub created: u32,
    /// Chapters the backend already had
    #[serde(default)]
    pub existed: u32,
    /// Chapters the backend rejected individually
    #[serde(default)]
    pub failed: u32,
}

impl From<BulkOutcome> for PublishTally {
    fn from(outcome: BulkOutcome) -> Self {
        PublishTally {
            created: outcome.created,
            existed: outcome.existed,
            failed: outcome.failed,
        }
    }
}

/// The publishing side of the pipeline
#[async_trait]
pub trait PublishingBackend: Send + Sync {
    /// Check backend reachability; implementations may cache a success
    async fn health(&self) -> Result<HealthInfo>;

    /// Create a story, or fetch the existing one keyed by source URL
    async fn create_story(&self, story: &StoryRecord) -> Result<StoryHandle>;

    /// Bulk chapter existence for a story
    ///
    /// Never fails: any transport or status problem yields
    /// [`ChapterExistence::Unavailable`] and the caller falls back to
    /// per-chapter checks.
    async fn chapter_status(&self, story_id: u64, expected_total: u32) -> ChapterExistence;

    /// Whether one chapter exists; answers `false` on any error
    async fn chapter_exists(&self, story_id: u64, number: u32) -> bool;

    /// Create a single chapter (idempotent on story + chapter number)
    async fn create_chapter(&self, chapter: &PreparedChapter) -> Result<CreatedChapter>;

    /// Create a batch of chapters in one call
    ///
    /// Errors here are expected and drive the publisher's per-chapter
    /// fallback.
    async fn create_chapters_bulk(&self, chapters: &[PreparedChapter]) -> Result<BulkOutcome>;
}

/// REST client for the CMS crawler plugin
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    check_timeout: Duration,
    create_timeout: Duration,
    health_cache: OnceCell<HealthInfo>,
}

#[derive(Deserialize)]
struct StoryResponse {
    story_id: u64,
    #[serde(default)]
    existed: bool,
}

#[derive(Deserialize)]
struct ChapterResponse {
    chapter_id: u64,
    #[serde(default)]
    existed: bool,
}

#[derive(Deserialize)]
struct ChapterExistsResponse {
    #[serde(default)]
    exists: bool,
}

#[derive(Deserialize)]
struct ChapterStatusResponse {
    #[serde(default)]
    count: u32,
    #[serde(default)]
    is_complete: bool,
    #[serde(default)]
    existing: BTreeSet<u32>,
}

impl HttpBackend {
    /// Build a client from backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            check_timeout: config.check_timeout,
            create_timeout: config.create_timeout,
            health_cache: OnceCell::new(),
        })
    }

    fn route(&self, tail: &str) -> String {
        format!("{}/wp-json/crawler/v1/{tail}", self.base_url)
    }

    async fn read_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(Error::Backend {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn chapter_payload(chapter: &PreparedChapter) -> serde_json::Value {
        serde_json::json!({
            "story_id": chapter.story_id,
            "chapter_number": chapter.number,
            "title": chapter.title,
            "original_title": chapter.original_title,
            "content": chapter.content,
            "source_url": chapter.source_url,
        })
    }
}

#[async_trait]
impl PublishingBackend for HttpBackend {
    async fn health(&self) -> Result<HealthInfo> {
        // First success is cached; later calls skip the round trip
        self.health_cache
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(self.route("health"))
                    .timeout(self.check_timeout)
                    .send()
                    .await?;
                let response = Self::read_success(response).await?;
                Ok::<_, Error>(response.json::<HealthInfo>().await?)
            })
            .await
            .cloned()
    }

    async fn create_story(&self, story: &StoryRecord) -> Result<StoryHandle> {
        let response = self
            .client
            .post(self.route("story"))
            .header("X-API-Key", &self.api_key)
            .timeout(self.create_timeout)
            .json(story)
            .send()
            .await?;
        let parsed: StoryResponse = Self::read_success(response).await?.json().await?;
        Ok(StoryHandle {
            id: parsed.story_id,
            existed: parsed.existed,
        })
    }

    async fn chapter_status(&self, story_id: u64, expected_total: u32) -> ChapterExistence {
        let request = self
            .client
            .get(self.route(&format!("story/{story_id}/chapter-status")))
            .header("X-API-Key", &self.api_key)
            .query(&[("expected", expected_total)])
            .timeout(self.check_timeout);

        let parsed: std::result::Result<ChapterStatusResponse, _> = async {
            let response = request.send().await?;
            Self::read_success(response).await?.json().await.map_err(Error::from)
        }
        .await;

        match parsed {
            Ok(status) => ChapterExistence::Resolved {
                count: status.count,
                is_complete: status.is_complete,
                existing: status.existing,
            },
            Err(e) => {
                tracing::warn!(
                    story_id = story_id,
                    error = %e,
                    "Bulk chapter status unavailable, falling back to per-chapter checks"
                );
                ChapterExistence::Unavailable
            }
        }
    }

    async fn chapter_exists(&self, story_id: u64, number: u32) -> bool {
        let request = self
            .client
            .get(self.route("chapter/exists"))
            .header("X-API-Key", &self.api_key)
            .query(&[("story_id", story_id), ("chapter_number", u64::from(number))])
            .timeout(self.check_timeout);

        let parsed: std::result::Result<ChapterExistsResponse, Error> = async {
            let response = request.send().await?;
            Self::read_success(response).await?.json().await.map_err(Error::from)
        }
        .await;

        match parsed {
            Ok(result) => result.exists,
            // Assume absent on error; re-publishing is idempotent, skipping
            // a missing chapter is not recoverable
            Err(e) => {
                tracing::debug!(
                    story_id = story_id,
                    chapter = number,
                    error = %e,
                    "Chapter existence check failed, assuming absent"
                );
                false
            }
        }
    }

    async fn create_chapter(&self, chapter: &PreparedChapter) -> Result<CreatedChapter> {
        let response = self
            .client
            .post(self.route("chapter"))
            .header("X-API-Key", &self.api_key)
            .timeout(self.create_timeout)
            .json(&Self::chapter_payload(chapter))
            .send()
            .await?;
        let parsed: ChapterResponse = Self::read_success(response).await?.json().await?;
        Ok(CreatedChapter {
            id: parsed.chapter_id,
            existed: parsed.existed,
        })
    }

    async fn create_chapters_bulk(&self, chapters: &[PreparedChapter]) -> Result<BulkOutcome> {
        let story_id = chapters.first().map(|c| c.story_id).unwrap_or_default();
        let payload = serde_json::json!({
            "story_id": story_id,
            "chapters": chapters
                .iter()
                .map(Self::chapter_payload)
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(self.route("chapters/bulk"))
            .header("X-API-Key", &self.api_key)
            .timeout(self.create_timeout)
            .json(&payload)
            .send()
            .await?;
        Ok(Self::read_success(response).await?.json().await?)
    }
}
