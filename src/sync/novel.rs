//! Item orchestration: one novel per call
//!
//! A run over one novel walks six steps: resume decision from the ledger,
//! backend health check, novel page scan, metadata translation (cached on
//! disk), idempotent story create with the cheap-before-expensive existence
//! short-circuit, then the windowed two-phase chapter pipeline. Phase 1
//! fetches and translates sequentially; phase 2 hands the prepared chapters
//! to the batch publisher. The ledger is the only carrier of progress
//! between runs.

use crate::error::{Error, Result};
use crate::parser::NovelPage;
use crate::publisher::{BatchPublisher, PublishOutcome};
use crate::resolver::ExistenceResolver;
use crate::retry::{RetryFailure, retry_with_backoff};
use crate::translate::translate_chunked;
use crate::types::{
    ChapterExistence, MetadataSnapshot, NovelOutcome, NovelStatus, PreparedChapter, PublishTally,
    StoryRecord, SyncReport,
};

use super::{NovelSync, novel_id_from_url};

impl NovelSync {
    /// Process one novel, resuming from whatever a previous run confirmed
    pub async fn sync_novel(&self, novel_url: &str) -> Result<NovelOutcome> {
        let progress = self.ledger.load().await?.progress(novel_url).cloned();

        if let Some(progress) = &progress
            && progress.is_fully_complete()
        {
            tracing::info!(
                novel = %novel_url,
                chapters = progress.chapters_total,
                "Novel already fully completed, skipping"
            );
            return Ok(NovelOutcome::Completed(SyncReport {
                story_id: progress.story_id.unwrap_or_default(),
                chapters_total: progress.chapters_total,
                chapters_done: progress.chapters_done,
                ..Default::default()
            }));
        }

        let resume_from = progress.as_ref().map(|p| p.resume_point()).unwrap_or(0);
        if resume_from > 0 {
            tracing::info!(
                novel = %novel_url,
                resume_from = resume_from,
                "Resuming novel from previous checkpoint"
            );
        }

        let health = self.backend.health().await?;
        tracing::debug!(status = %health.status, "Backend reachable");

        let novel_id = novel_id_from_url(novel_url);
        let page = self.parser.fetch_novel_page(novel_url).await?;
        let chapters_total = page.chapters.len() as u32;
        tracing::info!(
            novel = %novel_url,
            title = %page.metadata.title,
            chapters = chapters_total,
            "Scanned novel page"
        );

        let (title_translated, description_translated) =
            self.translate_metadata(&novel_id, &page).await;

        let record = StoryRecord {
            title: title_translated.clone(),
            original_title: page.metadata.title.clone(),
            author: page.metadata.author.clone(),
            description: description_translated.clone(),
            source_url: novel_url.to_string(),
            cover_url: page.metadata.cover_url.clone(),
        };
        let story = self.backend.create_story(&record).await?;

        let resolver = ExistenceResolver::new(self.backend.as_ref());
        let existence = if story.existed {
            tracing::info!(story_id = story.id, "Story already on backend");
            let existence = resolver.resolve(story.id, chapters_total).await;
            if let ChapterExistence::Resolved {
                is_complete: true, ..
            } = existence
            {
                // Everything is already there; skip cover, translation,
                // and every chapter fetch
                tracing::info!(
                    story_id = story.id,
                    chapters = chapters_total,
                    "All chapters already on backend, marking completed"
                );
                self.ledger
                    .upsert(
                        novel_url,
                        NovelStatus::Completed,
                        chapters_total,
                        chapters_total,
                        Some(story.id),
                    )
                    .await?;
                return Ok(NovelOutcome::Completed(SyncReport {
                    story_id: story.id,
                    chapters_total,
                    chapters_done: chapters_total,
                    ..Default::default()
                }));
            }
            existence
        } else {
            tracing::info!(story_id = story.id, "Story created");
            ChapterExistence::Resolved {
                count: 0,
                is_complete: false,
                existing: Default::default(),
            }
        };

        if let Some(cover_url) = &page.metadata.cover_url {
            // Cover problems never block chapters
            if let Err(e) = self
                .store
                .download_cover(&self.http, &novel_id, cover_url)
                .await
            {
                tracing::warn!(novel = %novel_url, error = %e, "Cover download failed");
            }
        }

        self.store
            .save_metadata(
                &novel_id,
                &MetadataSnapshot {
                    title: page.metadata.title.clone(),
                    title_translated: Some(title_translated.clone()),
                    author: page.metadata.author.clone(),
                    description: page.metadata.description.clone(),
                    description_translated: Some(description_translated),
                    kind: page.metadata.kind.clone(),
                    status: page.metadata.status.clone(),
                    cover_url: page.metadata.cover_url.clone(),
                    source_url: novel_url.to_string(),
                    total_chapters: chapters_total,
                },
            )
            .await?;

        self.ledger
            .upsert(
                novel_url,
                NovelStatus::InProgress,
                resume_from,
                chapters_total,
                Some(story.id),
            )
            .await?;

        // Window for this run
        let window_start = resume_from + 1;
        let window_end = (resume_from + self.config.crawl.max_chapters_per_run).min(chapters_total);

        let mut prepared: Vec<PreparedChapter> = Vec::new();
        let mut existed_in_window: u32 = 0;
        let mut skipped_no_content: u32 = 0;

        if window_start <= window_end {
            tracing::info!(
                novel = %novel_url,
                from = window_start,
                to = window_end,
                total = chapters_total,
                "Processing chapter window"
            );
        }

        for number in window_start..=window_end {
            if self.cancel.is_cancelled() {
                tracing::info!(novel = %novel_url, chapter = number, "Cancelled between chapters");
                return Ok(NovelOutcome::Cancelled);
            }

            let chapter = &page.chapters[(number - 1) as usize];

            if resolver.is_present(&existence, story.id, number).await {
                tracing::debug!(chapter = number, "Already on backend, skipping fetch");
                existed_in_window += 1;
                continue;
            }

            let Some(fetched) = self.parser.fetch_chapter_page(&chapter.source_url).await? else {
                tracing::warn!(
                    chapter = number,
                    url = %chapter.source_url,
                    "No content on chapter page, skipping"
                );
                skipped_no_content += 1;
                continue;
            };
            let title = if fetched.title.is_empty() {
                chapter.title.clone()
            } else {
                fetched.title
            };

            self.store
                .save_raw_chapter(&novel_id, &page.metadata.title, number, &title, &fetched.content)
                .await?;

            let (chapter_title, chapter_content) = match self
                .translate_chapter(&novel_id, &title_translated, number, &title, &fetched.content)
                .await?
            {
                Some(translated) => translated,
                None => {
                    // Terminal translation failure: stop here, publish
                    // nothing, leave the ledger at the last checkpoint
                    return Ok(NovelOutcome::TranslationStalled { chapter: number });
                }
            };

            self.store
                .save_translated_chapter(
                    &novel_id,
                    &title_translated,
                    number,
                    &chapter_title,
                    &chapter_content,
                )
                .await?;

            prepared.push(PreparedChapter {
                number,
                title: format!("{title_translated} Chapter {number}"),
                original_title: title,
                content: chapter_content,
                story_id: story.id,
                source_url: chapter.source_url.clone(),
            });
        }

        let mut tally = PublishTally::default();
        if !prepared.is_empty() {
            tracing::info!(
                novel = %novel_url,
                chapters = prepared.len(),
                "Publishing prepared chapters"
            );
            let publisher = BatchPublisher::new(
                self.backend.as_ref(),
                &self.ledger,
                &self.config.crawl,
                self.cancel.clone(),
            );
            match publisher
                .publish(novel_url, story.id, chapters_total, &prepared)
                .await?
            {
                PublishOutcome::Delivered(delivered) => tally = delivered,
                PublishOutcome::Cancelled(_) => {
                    // The publisher checkpointed everything it confirmed;
                    // the next run resumes from there
                    tracing::info!(novel = %novel_url, "Cancelled during publishing");
                    return Ok(NovelOutcome::Cancelled);
                }
            }
        }

        // Everything in the window is now confirmed, skipped, or published,
        // so the highest contiguous chapter is the window end itself.
        let chapters_done = window_end.max(resume_from);
        let status = if chapters_done >= chapters_total {
            NovelStatus::Completed
        } else {
            NovelStatus::InProgress
        };
        self.ledger
            .upsert(novel_url, status, chapters_done, chapters_total, Some(story.id))
            .await?;

        let report = SyncReport {
            story_id: story.id,
            created: tally.created,
            existed: existed_in_window + tally.existed,
            skipped_no_content,
            chapters_total,
            chapters_done,
        };
        match status {
            NovelStatus::Completed => {
                tracing::info!(novel = %novel_url, created = report.created, "Novel completed");
                Ok(NovelOutcome::Completed(report))
            }
            _ => {
                tracing::info!(
                    novel = %novel_url,
                    done = chapters_done,
                    total = chapters_total,
                    "Chapter cap reached, novel stays in progress"
                );
                Ok(NovelOutcome::InProgress(report))
            }
        }
    }

    // Title/description translation with the metadata snapshot as cache.
    // A failed metadata translation falls back to the source text; unlike
    // chapter content, untranslated metadata does not corrupt the archive.
    async fn translate_metadata(&self, novel_id: &str, page: &NovelPage) -> (String, String) {
        let Some(translator) = &self.translator else {
            return (
                page.metadata.title.clone(),
                page.metadata.description.clone(),
            );
        };

        let cached = self
            .store
            .load_metadata(novel_id)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        let title = match cached.title_translated {
            Some(title) => {
                tracing::debug!(novel_id = %novel_id, "Using cached title translation");
                title
            }
            None => self
                .translate_field(translator.as_ref(), &page.metadata.title)
                .await,
        };
        let description = match cached.description_translated {
            Some(description) => description,
            None => self
                .translate_field(translator.as_ref(), &page.metadata.description)
                .await,
        };
        (title, description)
    }

    async fn translate_field(&self, translator: &dyn crate::translate::Translate, text: &str) -> String {
        let cfg = &self.config.translation;
        let result = retry_with_backoff(&cfg.retry, || {
            translate_chunked(
                translator,
                text,
                &cfg.source_lang,
                &cfg.target_lang,
                cfg.max_chunk_chars,
            )
        })
        .await;
        match result {
            Ok(translated) => translated,
            Err(failure) => {
                tracing::warn!(error = %failure, "Metadata translation failed, keeping source text");
                text.to_string()
            }
        }
    }

    // Chapter translation through the disk cache and the retry policy.
    // `Ok(None)` signals terminal exhaustion of the retry budget.
    async fn translate_chapter(
        &self,
        novel_id: &str,
        novel_title_translated: &str,
        number: u32,
        title: &str,
        content: &str,
    ) -> Result<Option<(String, String)>> {
        let Some(translator) = &self.translator else {
            return Ok(Some((title.to_string(), content.to_string())));
        };

        if let Some(cached) = self
            .store
            .load_translated_chapter(novel_id, novel_title_translated, number)
            .await?
        {
            tracing::debug!(chapter = number, "Using cached chapter translation");
            return Ok(Some(cached));
        }

        let cfg = &self.config.translation;
        let result = retry_with_backoff(&cfg.retry, || async {
            let translated_title = translator
                .translate(title, &cfg.source_lang, &cfg.target_lang)
                .await?;
            let translated_content = translate_chunked(
                translator.as_ref(),
                content,
                &cfg.source_lang,
                &cfg.target_lang,
                cfg.max_chunk_chars,
            )
            .await?;
            Ok::<_, Error>((translated_title, translated_content))
        })
        .await;

        match result {
            Ok(translated) => Ok(Some(translated)),
            Err(RetryFailure::Exhausted {
                attempts,
                last_error,
            }) => {
                tracing::error!(
                    chapter = number,
                    attempts = attempts,
                    error = %last_error,
                    "Translation exhausted all attempts, halting this run"
                );
                Ok(None)
            }
            Err(RetryFailure::Fatal(e)) => Err(e),
        }
    }
}
