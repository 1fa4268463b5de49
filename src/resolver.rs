//! Chapter existence resolution
//!
//! Answering "which chapters does the backend already have" is on the hot
//! path of every re-run. One bulk status call answers for the whole story;
//! when that endpoint cannot answer, the resolver degrades to one existence
//! check per chapter, which is slower but never wrong in the unsafe
//! direction (an unknown chapter is treated as absent and re-published
//! idempotently).

use crate::backend::PublishingBackend;
use crate::types::ChapterExistence;

/// Resolves backend chapter existence for one story
pub struct ExistenceResolver<'a> {
    backend: &'a dyn PublishingBackend,
}

impl<'a> ExistenceResolver<'a> {
    /// Create a resolver over the given backend
    pub fn new(backend: &'a dyn PublishingBackend) -> Self {
        Self { backend }
    }

    /// Bulk existence query for a story
    pub async fn resolve(&self, story_id: u64, expected_total: u32) -> ChapterExistence {
        let existence = self.backend.chapter_status(story_id, expected_total).await;
        match &existence {
            ChapterExistence::Resolved {
                count, is_complete, ..
            } => {
                tracing::debug!(
                    story_id = story_id,
                    existing = count,
                    expected = expected_total,
                    complete = is_complete,
                    "Resolved chapter existence in one call"
                );
            }
            ChapterExistence::Unavailable => {
                tracing::info!(
                    story_id = story_id,
                    "Chapter status endpoint unavailable, using per-chapter checks"
                );
            }
        }
        existence
    }

    /// Whether one chapter is already on the backend
    ///
    /// Uses the resolved set when available, otherwise asks per chapter.
    /// Unknown means absent.
    pub async fn is_present(
        &self,
        existence: &ChapterExistence,
        story_id: u64,
        number: u32,
    ) -> bool {
        match existence {
            ChapterExistence::Resolved { .. } => existence.contains(number),
            ChapterExistence::Unavailable => self.backend.chapter_exists(story_id, number).await,
        }
    }
}
