//! Collection orchestration: a paginated listing of novels
//!
//! Walks listing pages in order and runs the item orchestrator for each
//! novel. Fully completed novels are skipped straight from the ledger
//! without touching the network. A failing novel is marked failed and its
//! siblings continue; cancellation stops the walk at the next boundary.

use crate::error::Result;
use crate::types::{CollectionOutcome, CollectionReport, NovelOutcome, NovelStatus};

use super::NovelSync;

impl NovelSync {
    /// Process every novel reachable from a collection listing URL
    pub async fn sync_collection(&self, collection_url: &str) -> Result<CollectionOutcome> {
        let mut report = CollectionReport::default();
        let mut current_url = Some(collection_url.to_string());

        while let Some(page_url) = current_url {
            if self.cancel.is_cancelled() {
                return Ok(CollectionOutcome::Cancelled(report));
            }
            if let Some(max_pages) = self.config.crawl.max_pages
                && report.pages >= max_pages
            {
                tracing::info!(max_pages = max_pages, "Page limit reached, stopping walk");
                return Ok(CollectionOutcome::PageLimit(report));
            }

            let page = self.parser.fetch_collection_page(&page_url).await?;
            report.pages += 1;
            tracing::info!(
                page = page.pagination.current,
                of = page.pagination.total,
                novels = page.novel_urls.len(),
                url = %page_url,
                "Processing collection page"
            );

            for (index, novel_url) in page.novel_urls.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Ok(CollectionOutcome::Cancelled(report));
                }

                let already_complete = self
                    .ledger
                    .load()
                    .await?
                    .progress(novel_url)
                    .is_some_and(|p| p.is_fully_complete());
                if already_complete {
                    tracing::info!(novel = %novel_url, "Already fully completed, skipping");
                    report.novels_skipped += 1;
                    continue;
                }

                if index > 0 {
                    tokio::time::sleep(self.config.crawl.request_delay).await;
                }

                match self.sync_novel(novel_url).await {
                    Ok(NovelOutcome::Cancelled) => {
                        return Ok(CollectionOutcome::Cancelled(report));
                    }
                    Ok(NovelOutcome::TranslationStalled { chapter }) => {
                        tracing::warn!(
                            novel = %novel_url,
                            chapter = chapter,
                            "Translation stalled, moving to next novel"
                        );
                        report.novels_failed += 1;
                    }
                    Ok(_) => {
                        report.novels_processed += 1;
                    }
                    Err(e) => {
                        tracing::error!(novel = %novel_url, error = %e, "Novel failed, continuing");
                        // A failed novel restarts from scratch next run;
                        // existing backend chapters come back as existed
                        self.ledger
                            .upsert(novel_url, NovelStatus::Failed, 0, 0, None)
                            .await?;
                        report.novels_failed += 1;
                    }
                }
            }

            self.ledger.record_collection_page(&page_url).await?;

            current_url = page.pagination.next_url;
            if current_url.is_some() {
                tokio::time::sleep(self.config.crawl.request_delay).await;
            }
        }

        tracing::info!(
            pages = report.pages,
            processed = report.novels_processed,
            skipped = report.novels_skipped,
            failed = report.novels_failed,
            "Collection walk finished"
        );
        Ok(CollectionOutcome::Finished(report))
    }
}
