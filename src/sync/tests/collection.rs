//! Collection orchestrator tests: pagination, skips, failure isolation

use std::sync::Arc;

use tempfile::TempDir;

use super::{config_in, ledger_progress, pipeline};
use crate::sync::test_support::*;
use crate::types::{CollectionOutcome, NovelStatus};

const PAGE_ONE: &str = "https://source.test/list/1_1.html";
const PAGE_TWO: &str = "https://source.test/list/1_2.html";

#[tokio::test]
async fn walks_every_page_and_processes_every_novel() {
    let dir = TempDir::new().unwrap();
    let parser = Arc::new(
        MockParser::default()
            .with_novel(1, "書一", 2)
            .with_novel(2, "書二", 2)
            .with_novel(3, "書三", 2)
            .with_collection_page(PAGE_ONE, &[1, 2], 1, 2, Some(PAGE_TWO))
            .with_collection_page(PAGE_TWO, &[3], 2, 2, None),
    );
    let backend = Arc::new(MockBackend::default());
    let sync = pipeline(config_in(&dir, 5), parser.clone(), None, backend.clone());

    let outcome = sync.sync_collection(PAGE_ONE).await.unwrap();

    match outcome {
        CollectionOutcome::Finished(report) => {
            assert_eq!(report.pages, 2);
            assert_eq!(report.novels_processed, 3);
            assert_eq!(report.novels_skipped, 0);
            assert_eq!(report.novels_failed, 0);
        }
        other => panic!("expected Finished, got {other:?}"),
    }

    let ledger = sync.ledger().load().await.unwrap();
    assert_eq!(ledger.last_collection_page.as_deref(), Some(PAGE_TWO));
    for id in 1..=3 {
        assert_eq!(
            ledger.progress(&novel_url(id)).unwrap().status,
            NovelStatus::Completed
        );
    }
}

#[tokio::test]
async fn fully_completed_novels_are_skipped_from_the_ledger() {
    let dir = TempDir::new().unwrap();
    let parser = Arc::new(
        MockParser::default()
            .with_novel(1, "書一", 2)
            .with_novel(2, "書二", 2)
            .with_collection_page(PAGE_ONE, &[1, 2], 1, 1, None),
    );
    let backend = Arc::new(MockBackend::default());
    let sync = pipeline(config_in(&dir, 5), parser.clone(), None, backend.clone());

    sync.ledger()
        .upsert(&novel_url(1), NovelStatus::Completed, 2, 2, Some(9))
        .await
        .unwrap();

    let outcome = sync.sync_collection(PAGE_ONE).await.unwrap();

    match outcome {
        CollectionOutcome::Finished(report) => {
            assert_eq!(report.novels_skipped, 1);
            assert_eq!(report.novels_processed, 1);
        }
        other => panic!("expected Finished, got {other:?}"),
    }
    assert_eq!(
        backend.published_numbers(),
        vec![1, 2],
        "only the second novel's chapters go out"
    );
}

#[tokio::test]
async fn failing_novel_is_marked_failed_and_siblings_continue() {
    let dir = TempDir::new().unwrap();
    // Novel 1 has no scripted page, so its scan fails
    let parser = Arc::new(
        MockParser::default()
            .with_novel(2, "書二", 2)
            .with_collection_page(PAGE_ONE, &[1, 2], 1, 1, None),
    );
    let backend = Arc::new(MockBackend::default());
    let sync = pipeline(config_in(&dir, 5), parser.clone(), None, backend.clone());

    let outcome = sync.sync_collection(PAGE_ONE).await.unwrap();

    match outcome {
        CollectionOutcome::Finished(report) => {
            assert_eq!(report.novels_failed, 1);
            assert_eq!(report.novels_processed, 1);
        }
        other => panic!("expected Finished, got {other:?}"),
    }
    assert_eq!(
        ledger_progress(&sync, &novel_url(1)).await.status,
        NovelStatus::Failed
    );
    assert_eq!(
        ledger_progress(&sync, &novel_url(2)).await.status,
        NovelStatus::Completed
    );
}

#[tokio::test]
async fn page_limit_stops_the_walk_early() {
    let dir = TempDir::new().unwrap();
    let parser = Arc::new(
        MockParser::default()
            .with_novel(1, "書一", 2)
            .with_collection_page(PAGE_ONE, &[1], 1, 2, Some(PAGE_TWO))
            .with_collection_page(PAGE_TWO, &[2], 2, 2, None),
    );
    let backend = Arc::new(MockBackend::default());
    let mut config = config_in(&dir, 5);
    config.crawl.max_pages = Some(1);
    let sync = pipeline(config, parser.clone(), None, backend.clone());

    let outcome = sync.sync_collection(PAGE_ONE).await.unwrap();

    match outcome {
        CollectionOutcome::PageLimit(report) => {
            assert_eq!(report.pages, 1);
            assert_eq!(report.novels_processed, 1);
        }
        other => panic!("expected PageLimit, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_the_walk_at_the_next_boundary() {
    let dir = TempDir::new().unwrap();
    let parser = Arc::new(
        MockParser::default()
            .with_novel(1, "書一", 2)
            .with_collection_page(PAGE_ONE, &[1], 1, 1, None),
    );
    let backend = Arc::new(MockBackend::default());
    let sync = pipeline(config_in(&dir, 5), parser.clone(), None, backend.clone());

    sync.cancel();
    let outcome = sync.sync_collection(PAGE_ONE).await.unwrap();

    match outcome {
        CollectionOutcome::Cancelled(report) => assert_eq!(report.pages, 0),
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert_eq!(parser.fetched_chapters(), 0);
}

#[tokio::test]
async fn page_cursor_is_persisted_after_each_page() {
    let dir = TempDir::new().unwrap();
    let parser = Arc::new(
        MockParser::default()
            .with_novel(1, "書一", 1)
            .with_collection_page(PAGE_ONE, &[1], 1, 1, None),
    );
    let backend = Arc::new(MockBackend::default());
    let sync = pipeline(config_in(&dir, 5), parser.clone(), None, backend.clone());

    sync.sync_collection(PAGE_ONE).await.unwrap();

    let ledger = sync.ledger().load().await.unwrap();
    assert_eq!(ledger.last_collection_page.as_deref(), Some(PAGE_ONE));
}
