//! Batch chapter publishing
//!
//! Prepared chapters go out in contiguous, order-preserving batches. Each
//! batch is attempted as one bulk create; when the bulk call fails (or
//! reports per-chapter rejects) the publisher replays that batch as
//! strictly-ordered individual creates. The ledger is checkpointed after
//! every confirmed batch and after every individual create, so an
//! interruption at any point resumes exactly where publishing stopped.
//!
//! An individual create failure halts the whole publish. Skipping a failed
//! chapter and continuing would leave a hole in the sequence that the
//! resume arithmetic (highest contiguous chapter) could never see.
//!
//! The cancellation token is observed before every batch and before every
//! individual create, so a stop request never lets further remote calls out.
//! The checkpoints make the cancelled run resumable with no rollback.

use tokio_util::sync::CancellationToken;

use crate::backend::PublishingBackend;
use crate::config::CrawlConfig;
use crate::error::{PublishError, Result};
use crate::ledger::LedgerStore;
use crate::types::{NovelStatus, PreparedChapter, PublishTally};

/// How a publish run ended
#[derive(Debug)]
pub enum PublishOutcome {
    /// Every prepared chapter reached the backend
    Delivered(PublishTally),
    /// Cancellation stopped publishing at a batch or record boundary;
    /// the tally covers the work confirmed before the stop
    Cancelled(PublishTally),
}

/// Publishes prepared chapters in batches, checkpointing progress
pub struct BatchPublisher<'a> {
    backend: &'a dyn PublishingBackend,
    ledger: &'a LedgerStore,
    config: &'a CrawlConfig,
    cancel: CancellationToken,
}

impl<'a> BatchPublisher<'a> {
    /// Create a publisher over the given backend and ledger
    pub fn new(
        backend: &'a dyn PublishingBackend,
        ledger: &'a LedgerStore,
        config: &'a CrawlConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            ledger,
            config,
            cancel,
        }
    }

    /// Publish all chapters, returning how the run ended
    ///
    /// `chapters` must be sorted by chapter number; batches inherit that
    /// order. On error or cancellation the ledger already reflects the last
    /// confirmed chapter.
    pub async fn publish(
        &self,
        novel_url: &str,
        story_id: u64,
        chapters_total: u32,
        chapters: &[PreparedChapter],
    ) -> Result<PublishOutcome> {
        let mut tally = PublishTally::default();

        for (index, batch) in chapters.chunks(self.config.bulk_chapter_size).enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(novel = %novel_url, "Cancelled before the next publish batch");
                return Ok(PublishOutcome::Cancelled(tally));
            }
            if index > 0 {
                tokio::time::sleep(self.config.request_delay).await;
            }

            let first = batch.first().map(|c| c.number).unwrap_or_default();
            let last = batch.last().map(|c| c.number).unwrap_or_default();
            tracing::info!(
                novel = %novel_url,
                story_id = story_id,
                batch = index + 1,
                chapters = format!("{first}..={last}"),
                "Publishing chapter batch"
            );

            match self.backend.create_chapters_bulk(batch).await {
                Ok(outcome) if outcome.failed == 0 => {
                    tally.merge(outcome.into());
                    self.checkpoint(novel_url, story_id, last, chapters_total)
                        .await?;
                }
                Ok(outcome) => {
                    tracing::warn!(
                        novel = %novel_url,
                        rejected = outcome.failed,
                        "Bulk create rejected chapters, replaying batch individually"
                    );
                    match self
                        .publish_individually(novel_url, story_id, chapters_total, batch)
                        .await?
                    {
                        PublishOutcome::Delivered(replayed) => tally.merge(replayed),
                        PublishOutcome::Cancelled(replayed) => {
                            tally.merge(replayed);
                            return Ok(PublishOutcome::Cancelled(tally));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        novel = %novel_url,
                        error = %e,
                        "Bulk create failed, falling back to individual creates"
                    );
                    match self
                        .publish_individually(novel_url, story_id, chapters_total, batch)
                        .await?
                    {
                        PublishOutcome::Delivered(replayed) => tally.merge(replayed),
                        PublishOutcome::Cancelled(replayed) => {
                            tally.merge(replayed);
                            return Ok(PublishOutcome::Cancelled(tally));
                        }
                    }
                }
            }
        }

        Ok(PublishOutcome::Delivered(tally))
    }

    // Ordered per-chapter replay of one batch. Individual creates are
    // idempotent, so chapters the bulk attempt already landed come back as
    // existed rather than duplicates.
    async fn publish_individually(
        &self,
        novel_url: &str,
        story_id: u64,
        chapters_total: u32,
        batch: &[PreparedChapter],
    ) -> Result<PublishOutcome> {
        let mut tally = PublishTally::default();

        for chapter in batch {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    novel = %novel_url,
                    chapter = chapter.number,
                    "Cancelled before the next individual create"
                );
                return Ok(PublishOutcome::Cancelled(tally));
            }

            let created = self
                .backend
                .create_chapter(chapter)
                .await
                .map_err(|e| PublishError::ChapterFailed {
                    number: chapter.number,
                    reason: e.to_string(),
                })?;

            if created.existed {
                tally.existed += 1;
            } else {
                tally.created += 1;
            }

            self.checkpoint(novel_url, story_id, chapter.number, chapters_total)
                .await?;
        }

        Ok(PublishOutcome::Delivered(tally))
    }

    async fn checkpoint(
        &self,
        novel_url: &str,
        story_id: u64,
        chapters_done: u32,
        chapters_total: u32,
    ) -> Result<()> {
        self.ledger
            .upsert(
                novel_url,
                NovelStatus::InProgress,
                chapters_done,
                chapters_total,
                Some(story_id),
            )
            .await
    }
}
