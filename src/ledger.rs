//! Durable progress ledger
//!
//! The ledger is a single JSON document mapping novel source URLs to
//! [`NovelProgress`] records, plus the last collection page cursor. Every
//! mutation is a full read-modify-write of the whole document; the design
//! assumes one orchestrator process at a time (single writer, no locking).
//!
//! Saves are atomic from the caller's perspective: the document is written to
//! a temporary file in the same directory and renamed over the target, so a
//! crash mid-write never leaves a half-written ledger observable on the next
//! load. A ledger file that exists but cannot be parsed is fatal, because
//! guessing would risk re-publishing everything previous runs confirmed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{LedgerError, Result};
use crate::types::{NovelProgress, NovelStatus};

/// The persisted ledger document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Per-novel progress, keyed by novel source URL
    #[serde(default)]
    pub novels: HashMap<String, NovelProgress>,

    /// URL of the last collection listing page processed
    #[serde(default)]
    pub last_collection_page: Option<String>,
}

impl Ledger {
    /// Progress record for a novel, if one exists
    pub fn progress(&self, novel_url: &str) -> Option<&NovelProgress> {
        self.novels.get(novel_url)
    }
}

/// Load/save access to the ledger file
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger, returning an empty one if no file exists yet
    pub async fn load(&self) -> Result<Ledger> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Ledger::default());
            }
            Err(err) => {
                return Err(LedgerError::Unreadable {
                    path: self.path.display().to_string(),
                    reason: err.to_string(),
                }
                .into());
            }
        };

        serde_json::from_slice(&bytes).map_err(|err| {
            LedgerError::Corrupt {
                path: self.path.display().to_string(),
                reason: err.to_string(),
            }
            .into()
        })
    }

    /// Persist the ledger, replacing the previous document atomically
    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        let write_failed = |reason: String| LedgerError::WriteFailed {
            path: self.path.display().to_string(),
            reason,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }

        let data =
            serde_json::to_vec_pretty(ledger).map_err(|e| write_failed(e.to_string()))?;

        // Temp file lives in the same directory so the rename stays on one
        // filesystem and is atomic.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &data)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| write_failed(e.to_string()))?;

        Ok(())
    }

    /// Update one novel's progress record and persist the whole ledger
    ///
    /// Creates the record on first encounter; sets `updated_at` to now.
    pub async fn upsert(
        &self,
        novel_url: &str,
        status: NovelStatus,
        chapters_done: u32,
        chapters_total: u32,
        story_id: Option<u64>,
    ) -> Result<()> {
        let mut ledger = self.load().await?;
        let entry = ledger
            .novels
            .entry(novel_url.to_string())
            .or_insert_with(|| NovelProgress {
                status: NovelStatus::Pending,
                chapters_done: 0,
                chapters_total: 0,
                story_id: None,
                updated_at: Utc::now(),
            });

        entry.status = status;
        entry.chapters_done = chapters_done;
        entry.chapters_total = chapters_total;
        // story_id is set once and kept thereafter
        if entry.story_id.is_none() {
            entry.story_id = story_id;
        }
        entry.updated_at = Utc::now();

        self.save(&ledger).await
    }

    /// Persist the collection pagination cursor
    pub async fn record_collection_page(&self, page_url: &str) -> Result<()> {
        let mut ledger = self.load().await?;
        ledger.last_collection_page = Some(page_url.to_string());
        self.save(&ledger).await
    }
}
