//! # novel-sync
//!
//! Resumable crawl/translate/publish pipeline for serialized web fiction.
//!
//! ## Design Philosophy
//!
//! novel-sync is designed to be:
//! - **Resumable** - every run checkpoints a durable ledger; interruption at
//!   any point is recovered by running again
//! - **Idempotent** - re-runs never duplicate stories or chapters on the
//!   backend
//! - **Order-preserving** - chapters reach the backend strictly in sequence,
//!   with no gaps
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use novel_sync::{Config, NovelSync};
//! use novel_sync::config::BackendConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         backend: BackendConfig {
//!             base_url: "https://cms.example.com".to_string(),
//!             api_key: "secret".to_string(),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let sync = NovelSync::new(config)?;
//!     let outcome = sync.sync_novel("https://www.xbanxia.cc/books/396941.html").await?;
//!     println!("Outcome: {:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Publishing backend client
pub mod backend;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Durable progress ledger
pub mod ledger;
/// Source-site page fetching and parsing
pub mod parser;
/// Batch chapter publishing
pub mod publisher;
/// Backend chapter existence resolution
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Local content store
pub mod storage;
/// Crawl/translate/publish orchestration
pub mod sync;
/// Machine translation client and chunking
pub mod translate;
/// Core types: progress records and run outcomes
pub mod types;

// Re-export commonly used types
pub use backend::{HttpBackend, PublishingBackend};
pub use config::Config;
pub use error::{Error, LedgerError, PublishError, Result};
pub use ledger::{Ledger, LedgerStore};
pub use parser::{SourceParser, XbanxiaParser};
pub use storage::ContentStore;
pub use sync::NovelSync;
pub use translate::{GoogleTranslator, Translate};
pub use types::{
    ChapterExistence, CollectionOutcome, CollectionReport, NovelOutcome, NovelProgress,
    NovelStatus, SyncReport,
};

/// Helper function to run a collection walk with graceful signal handling.
///
/// Starts the walk and cancels it when a termination signal arrives; the
/// pipeline stops at the next chapter or novel boundary with its progress
/// checkpointed.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use novel_sync::{Config, NovelSync, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sync = NovelSync::new(Config::default())?;
///     let outcome = run_with_shutdown(&sync, "https://www.xbanxia.cc/list/1_1.html").await?;
///     println!("{outcome:?}");
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    sync: &NovelSync,
    collection_url: &str,
) -> Result<CollectionOutcome> {
    let token = sync.cancel_token();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        token.cancel();
    });

    // The walk observes the token between chapters and novels and returns
    // a Cancelled outcome on its own once the signal fires.
    let outcome = sync.sync_collection(collection_url).await;
    signal_task.abort();
    outcome
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
