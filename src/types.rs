//! Core types: ledger records, transient chapter records, and run outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Processing state of one novel in the ledger
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NovelStatus {
    /// Known but not yet processed
    #[default]
    Pending,
    /// Partially processed; `chapters_done` marks the resume point
    InProgress,
    /// All known chapters confirmed on the backend
    Completed,
    /// Last attempt ended in an error; retried on the next encounter
    Failed,
}

impl std::fmt::Display for NovelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NovelStatus::Pending => "pending",
            NovelStatus::InProgress => "in_progress",
            NovelStatus::Completed => "completed",
            NovelStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Durable per-novel progress record
///
/// Keyed by the novel's source URL in the [`Ledger`](crate::ledger::Ledger).
/// Created on first encounter and never deleted; it is the resumability
/// record that lets interrupted runs pick up where they stopped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NovelProgress {
    /// Current processing state
    pub status: NovelStatus,

    /// Count of chapters confirmed processed, equal to the highest
    /// contiguous chapter number reached
    pub chapters_done: u32,

    /// Total chapter count as of the last scan of the novel page
    pub chapters_total: u32,

    /// Backend story ID, set once on first create and immutable afterwards
    pub story_id: Option<u64>,

    /// Timestamp of the last mutation
    pub updated_at: DateTime<Utc>,
}

impl NovelProgress {
    /// True when every known chapter is confirmed processed
    ///
    /// A `Completed` status alone is not enough: an entry marked completed
    /// with `chapters_done < chapters_total` is a recoverable inconsistency
    /// from a prior partial run (or the site added chapters) and must resume,
    /// not skip.
    pub fn is_fully_complete(&self) -> bool {
        self.status == NovelStatus::Completed && self.chapters_done >= self.chapters_total
    }

    /// Chapter number to resume after (0 = start from the beginning)
    pub fn resume_point(&self) -> u32 {
        match self.status {
            NovelStatus::InProgress | NovelStatus::Completed => self.chapters_done,
            NovelStatus::Pending | NovelStatus::Failed => 0,
        }
    }
}

/// One entry from a novel's chapter list (transient, produced by the parser)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterRef {
    /// 1-based sequence number; defines strict publish order
    pub number: u32,
    /// Chapter title as listed on the novel page
    pub title: String,
    /// Absolute URL of the chapter page
    pub source_url: String,
}

/// A chapter fetched, optionally translated, and ready to publish
/// (transient, scoped to one run)
#[derive(Clone, Debug, Serialize)]
pub struct PreparedChapter {
    /// 1-based sequence number; ordering must be preserved through publish
    pub number: u32,
    /// Title in the target language (or the original when translation is off)
    pub title: String,
    /// Title in the source language
    pub original_title: String,
    /// Content in the target language
    pub content: String,
    /// Backend story ID this chapter belongs to
    pub story_id: u64,
    /// Source URL of the chapter page
    pub source_url: String,
}

/// Novel metadata scraped from the novel page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NovelMetadata {
    /// Title in the source language
    pub title: String,
    /// Author name
    pub author: String,
    /// Description, HTML formatting preserved
    pub description: String,
    /// Cover image URL, if any
    pub cover_url: Option<String>,
    /// Genre/category label
    pub kind: String,
    /// Publication status label (e.g. ongoing/finished)
    pub status: String,
}

/// Metadata snapshot persisted next to a novel's content
///
/// Doubles as the translation cache for the title and description: a re-run
/// finds the translated fields here and skips those translation calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Title in the source language
    pub title: String,
    /// Translated title, present once translation has succeeded
    #[serde(default)]
    pub title_translated: Option<String>,
    /// Author name
    pub author: String,
    /// Description in the source language
    pub description: String,
    /// Translated description, present once translation has succeeded
    #[serde(default)]
    pub description_translated: Option<String>,
    /// Genre/category label
    #[serde(default)]
    pub kind: String,
    /// Publication status label
    #[serde(default)]
    pub status: String,
    /// Cover image URL
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Source URL of the novel page
    pub source_url: String,
    /// Total chapter count at snapshot time
    pub total_chapters: u32,
}

/// Story payload for the backend's idempotent create-or-fetch call
#[derive(Clone, Debug, Serialize)]
pub struct StoryRecord {
    /// Title in the target language
    pub title: String,
    /// Title in the source language
    pub original_title: String,
    /// Author name
    pub author: String,
    /// Description in the target language
    pub description: String,
    /// Source URL; the backend's identity key for stories
    pub source_url: String,
    /// Cover image URL for the backend to mirror
    pub cover_url: Option<String>,
}

/// Which chapters already exist on the backend for one story
///
/// `Unavailable` is a degraded mode, not an error: the bulk status endpoint
/// could not answer, and callers must fall back to per-chapter existence
/// checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChapterExistence {
    /// The bulk query answered
    Resolved {
        /// Number of chapters present on the backend
        count: u32,
        /// True when `count` covers every expected chapter
        is_complete: bool,
        /// Sequence numbers of the chapters present
        existing: BTreeSet<u32>,
    },
    /// The bulk query failed; fall back to per-chapter checks
    Unavailable,
}

impl ChapterExistence {
    /// True when the given chapter is known to exist
    ///
    /// `Unavailable` always answers false; the caller is expected to have
    /// switched to per-chapter checks instead.
    pub fn contains(&self, number: u32) -> bool {
        match self {
            ChapterExistence::Resolved { existing, .. } => existing.contains(&number),
            ChapterExistence::Unavailable => false,
        }
    }
}

/// Created/existed/failed counts accumulated across publish calls
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishTally {
    /// Chapters newly created on the backend
    pub created: u32,
    /// Chapters the backend already had
    pub existed: u32,
    /// Chapters the backend rejected inside an otherwise successful bulk call
    pub failed: u32,
}

impl PublishTally {
    /// Fold another tally into this one
    pub fn merge(&mut self, other: PublishTally) {
        self.created += other.created;
        self.existed += other.existed;
        self.failed += other.failed;
    }
}

/// Counts describing what one novel run did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Backend story ID
    pub story_id: u64,
    /// Chapters newly published this run
    pub created: u32,
    /// Chapters skipped because the backend already had them
    pub existed: u32,
    /// Chapters skipped because the source page had no content
    pub skipped_no_content: u32,
    /// Total chapter count from the latest scan
    pub chapters_total: u32,
    /// Ledger `chapters_done` after this run
    pub chapters_done: u32,
}

/// Outcome of one item-orchestrator run over a single novel
///
/// Terminal translation failure and cancellation are outcomes rather than
/// errors so that callers must handle every case explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NovelOutcome {
    /// Every known chapter is confirmed on the backend
    Completed(SyncReport),
    /// The per-run chapter cap was reached with chapters remaining
    InProgress(SyncReport),
    /// Translation failed terminally on the given chapter; nothing from this
    /// run was published and the ledger still reads `in_progress`
    TranslationStalled {
        /// Chapter whose translation exhausted all retry attempts
        chapter: u32,
    },
    /// A cancellation signal stopped the run; progress already checkpointed
    /// in the ledger is kept
    Cancelled,
}

/// Outcome of a collection walk
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// The walk reached the last page of the listing
    Finished(CollectionReport),
    /// The configured page cap stopped the walk early
    PageLimit(CollectionReport),
    /// A cancellation signal stopped the walk
    Cancelled(CollectionReport),
}

/// Counts describing one collection walk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Listing pages visited
    pub pages: usize,
    /// Novels handed to the item orchestrator
    pub novels_processed: usize,
    /// Novels skipped because the ledger already marks them fully complete
    pub novels_skipped: usize,
    /// Novels whose run ended in an error (logged, marked failed, skipped)
    pub novels_failed: usize,
}

/// Pagination state extracted from a collection listing page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number
    pub current: u32,
    /// Total page count
    pub total: u32,
    /// Absolute URL of the next page, None on the last page
    pub next_url: Option<String>,
}
