//! Crawl/translate/publish orchestration
//!
//! [`NovelSync`] owns the configuration, the progress ledger, the content
//! store, and the collaborator trait objects, and exposes the two entry
//! points: [`NovelSync::sync_novel`] for one novel and
//! [`NovelSync::sync_collection`] for a paginated listing.
//!
//! Orchestration is deliberately a single sequential thread of control.
//! Chapter order is a correctness property all the way through to the
//! backend, and a sequential loop plus idempotent backend calls is what
//! makes interruption at any point recoverable.

mod collection;
mod novel;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::{HttpBackend, PublishingBackend};
use crate::config::Config;
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::parser::{SourceParser, XbanxiaParser};
use crate::storage::ContentStore;
use crate::translate::{GoogleTranslator, Translate};

/// The crawl/translate/publish pipeline
pub struct NovelSync {
    config: Config,
    ledger: LedgerStore,
    store: ContentStore,
    parser: Arc<dyn SourceParser>,
    translator: Option<Arc<dyn Translate>>,
    backend: Arc<dyn PublishingBackend>,
    http: reqwest::Client,
    cancel: CancellationToken,
}

impl std::fmt::Debug for NovelSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NovelSync")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl NovelSync {
    /// Build the pipeline with production collaborators
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let translator: Option<Arc<dyn Translate>> = if config.translation.enabled {
            let api_key = config.translation.api_key.clone().unwrap_or_default();
            Some(Arc::new(GoogleTranslator::new(api_key)))
        } else {
            None
        };
        let parser: Arc<dyn SourceParser> = Arc::new(XbanxiaParser::new()?);
        let backend: Arc<dyn PublishingBackend> = Arc::new(HttpBackend::new(&config.backend)?);

        Self::with_collaborators(config, parser, translator, backend)
    }

    /// Build the pipeline with injected collaborators
    ///
    /// Used by tests and by embedders that bring their own parser,
    /// translator, or backend implementations. Validates the configuration
    /// the same way [`NovelSync::new`] does.
    pub fn with_collaborators(
        config: Config,
        parser: Arc<dyn SourceParser>,
        translator: Option<Arc<dyn Translate>>,
        backend: Arc<dyn PublishingBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = LedgerStore::new(&config.storage.ledger_path);
        let store = ContentStore::new(&config.storage.data_dir);
        Ok(Self {
            config,
            ledger,
            store,
            parser,
            translator,
            backend,
            http: reqwest::Client::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Token observed between chapters and between novels
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a graceful stop at the next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The progress ledger backing this pipeline
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }
}

/// Extract the novel's site ID from its page URL
///
/// `https://host/books/396941.html` becomes `396941`. Falls back to the
/// whole last path segment when the URL has no `.html` suffix.
pub(crate) fn novel_id_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .trim_end_matches(".html")
        .to_string()
}
