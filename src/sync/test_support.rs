//! Mock collaborators for orchestrator tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::backend::{BulkOutcome, CreatedChapter, HealthInfo, PublishingBackend, StoryHandle};
use crate::error::{Error, Result};
use crate::parser::{ChapterPage, CollectionPage, NovelPage, SourceParser};
use crate::translate::Translate;
use crate::types::{ChapterExistence, ChapterRef, NovelMetadata, Pagination, PreparedChapter, StoryRecord};

pub fn novel_url(id: u32) -> String {
    format!("https://source.test/books/{id}.html")
}

pub fn chapter_url(novel: u32, number: u32) -> String {
    format!("https://source.test/books/{novel}/{number}.html")
}

/// Build a novel page with `chapter_count` chapters
pub fn novel_page(novel: u32, title: &str, chapter_count: u32) -> NovelPage {
    NovelPage {
        metadata: NovelMetadata {
            title: title.to_string(),
            author: "作者".into(),
            description: "<p>簡介</p>".into(),
            cover_url: None,
            kind: "玄幻".into(),
            status: "連載中".into(),
        },
        chapters: (1..=chapter_count)
            .map(|number| ChapterRef {
                number,
                title: format!("第{number}章"),
                source_url: chapter_url(novel, number),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockParser {
    pub novel_pages: HashMap<String, NovelPage>,
    pub collection_pages: HashMap<String, CollectionPage>,
    /// Chapter URLs that answer "no content"
    pub empty_chapters: HashSet<String>,
    pub chapter_fetches: AtomicU32,
}

impl MockParser {
    pub fn with_novel(mut self, novel: u32, title: &str, chapter_count: u32) -> Self {
        self.novel_pages
            .insert(novel_url(novel), novel_page(novel, title, chapter_count));
        self
    }

    pub fn with_collection_page(
        mut self,
        url: &str,
        novels: &[u32],
        current: u32,
        total: u32,
        next_url: Option<&str>,
    ) -> Self {
        self.collection_pages.insert(
            url.to_string(),
            CollectionPage {
                novel_urls: novels.iter().map(|id| novel_url(*id)).collect(),
                pagination: Pagination {
                    current,
                    total,
                    next_url: next_url.map(str::to_string),
                },
            },
        );
        self
    }

    pub fn fetched_chapters(&self) -> u32 {
        self.chapter_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceParser for MockParser {
    async fn fetch_novel_page(&self, url: &str) -> Result<NovelPage> {
        self.novel_pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Parse(format!("no novel page scripted for {url}")))
    }

    async fn fetch_collection_page(&self, url: &str) -> Result<CollectionPage> {
        self.collection_pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Parse(format!("no collection page scripted for {url}")))
    }

    async fn fetch_chapter_page(&self, url: &str) -> Result<Option<ChapterPage>> {
        self.chapter_fetches.fetch_add(1, Ordering::SeqCst);
        if self.empty_chapters.contains(url) {
            return Ok(None);
        }
        Ok(Some(ChapterPage {
            title: format!("章 {url}"),
            content: format!("內容 {url}"),
        }))
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Prefixes "EN " after an optional number of scripted failures
#[derive(Default)]
pub struct MockTranslator {
    pub fail_first: u32,
    pub always_fail: bool,
    pub calls: AtomicU32,
}

impl MockTranslator {
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translate for MockTranslator {
    async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail || call < self.fail_first {
            return Err(Error::Translation("scripted failure".into()));
        }
        Ok(format!("EN {text}"))
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum BackendCall {
    Bulk(Vec<u32>),
    Single(u32),
}

pub struct MockBackend {
    pub story_id: u64,
    pub story_existed: bool,
    /// What `chapter_status` answers
    pub existence: ChapterExistence,
    /// Per-chapter `chapter_exists` answers (fallback path)
    pub single_existing: BTreeSet<u32>,
    /// First chapter numbers of batches whose bulk create fails
    pub failing_bulk_first_numbers: HashSet<u32>,
    pub calls: Mutex<Vec<BackendCall>>,
    pub story_creates: AtomicU32,
    pub exists_checks: AtomicU32,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            story_id: 77,
            story_existed: false,
            existence: ChapterExistence::Resolved {
                count: 0,
                is_complete: false,
                existing: BTreeSet::new(),
            },
            single_existing: BTreeSet::new(),
            failing_bulk_first_numbers: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            story_creates: AtomicU32::new(0),
            exists_checks: AtomicU32::new(0),
        }
    }
}

impl MockBackend {
    pub fn existing_story_with(existing: impl IntoIterator<Item = u32>, expected: u32) -> Self {
        let existing: BTreeSet<u32> = existing.into_iter().collect();
        let count = existing.len() as u32;
        Self {
            story_existed: true,
            existence: ChapterExistence::Resolved {
                count,
                is_complete: count >= expected,
                existing,
            },
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().drain(..).collect()
    }

    pub fn published_numbers(&self) -> Vec<u32> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .flat_map(|call| match call {
                BackendCall::Bulk(numbers) => numbers.clone(),
                BackendCall::Single(number) => vec![*number],
            })
            .collect()
    }
}

#[async_trait]
impl PublishingBackend for MockBackend {
    async fn health(&self) -> Result<HealthInfo> {
        Ok(HealthInfo {
            status: "ok".into(),
            version: None,
        })
    }

    async fn create_story(&self, _: &StoryRecord) -> Result<StoryHandle> {
        self.story_creates.fetch_add(1, Ordering::SeqCst);
        Ok(StoryHandle {
            id: self.story_id,
            existed: self.story_existed,
        })
    }

    async fn chapter_status(&self, _: u64, _: u32) -> ChapterExistence {
        self.existence.clone()
    }

    async fn chapter_exists(&self, _: u64, number: u32) -> bool {
        self.exists_checks.fetch_add(1, Ordering::SeqCst);
        self.single_existing.contains(&number)
    }

    async fn create_chapter(&self, chapter: &PreparedChapter) -> Result<CreatedChapter> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::Single(chapter.number));
        Ok(CreatedChapter {
            id: u64::from(chapter.number) + 1000,
            existed: false,
        })
    }

    async fn create_chapters_bulk(&self, chapters: &[PreparedChapter]) -> Result<BulkOutcome> {
        let numbers: Vec<u32> = chapters.iter().map(|c| c.number).collect();
        let failing = self.failing_bulk_first_numbers.contains(&numbers[0]);
        self.calls.lock().unwrap().push(BackendCall::Bulk(numbers.clone()));
        if failing {
            return Err(Error::Backend {
                status: 500,
                message: "bulk failed".into(),
            });
        }
        Ok(BulkOutcome {
            created: numbers.len() as u32,
            existed: 0,
            failed: 0,
        })
    }
}
