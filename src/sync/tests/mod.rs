//! Orchestrator tests with mock collaborators

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod collection;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::{
    BackendConfig, Config, CrawlConfig, RetryConfig, StorageConfig, TranslationConfig,
};
use crate::sync::NovelSync;
use crate::sync::test_support::{MockBackend, MockParser, MockTranslator};
use crate::types::NovelProgress;

pub(crate) fn config_in(dir: &TempDir, max_chapters_per_run: u32) -> Config {
    Config {
        crawl: CrawlConfig {
            max_chapters_per_run,
            request_delay: Duration::ZERO,
            bulk_chapter_size: 50,
            max_pages: None,
        },
        translation: TranslationConfig {
            retry: RetryConfig {
                max_attempts: 2,
                max_delay: Duration::from_secs(600),
                jitter: false,
            },
            ..Default::default()
        },
        backend: BackendConfig {
            base_url: "https://cms.test".into(),
            api_key: "test-key".into(),
            ..Default::default()
        },
        storage: StorageConfig {
            data_dir: dir.path().join("novels"),
            ledger_path: dir.path().join("crawler_state.json"),
        },
    }
}

pub(crate) fn pipeline(
    config: Config,
    parser: Arc<MockParser>,
    translator: Option<Arc<MockTranslator>>,
    backend: Arc<MockBackend>,
) -> NovelSync {
    NovelSync::with_collaborators(
        config,
        parser,
        translator.map(|t| t as Arc<dyn crate::translate::Translate>),
        backend,
    )
    .expect("test config should validate")
}

pub(crate) async fn ledger_progress(sync: &NovelSync, novel_url: &str) -> NovelProgress {
    sync.ledger()
        .load()
        .await
        .unwrap()
        .progress(novel_url)
        .cloned()
        .expect("ledger entry should exist")
}
