// ABOUTME: Synchronization engine - read sink, reconcile against source, write decisions
// ABOUTME: Defines the source and sink seams so the engine runs against any implementation

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod reader;
pub mod reconciler;
pub mod runner;
pub mod writer;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AppId, AttributePatch, GameRecord, PageArtwork, SinkPage, StoredAttributes};

pub use reader::{PageCursor, SinkReader, DEFAULT_PAGE_SIZE};
pub use reconciler::Reconciler;
pub use runner::{SyncReport, SyncRunner};
pub use writer::{RecordFailure, SinkWriter, WriteOutcome};

/// Where game records come from.
#[async_trait]
pub trait GameSource: Send + Sync {
    /// Return the complete current list of games for the configured account.
    async fn fetch_games(&self) -> Result<Vec<GameRecord>>;
}

/// One page of results from a sink query.
#[derive(Debug, Clone, Default)]
pub struct PageBatch {
    pub pages: Vec<SinkPage>,
    /// Entries that exist in the sink but carry no external id
    pub unkeyed: usize,
    /// `None` once the sink has no more results
    pub next_cursor: Option<String>,
}

/// The destination database, one page per game.
#[async_trait]
pub trait PageSink: Send + Sync {
    /// Fetch one batch of pages starting at `start_cursor` (`None` = first batch).
    async fn query_pages(&self, start_cursor: Option<&str>, page_size: usize) -> Result<PageBatch>;

    /// Insert a new page and return its page id.
    async fn create_page(
        &self,
        external_id: AppId,
        attributes: &StoredAttributes,
        artwork: &PageArtwork,
    ) -> Result<String>;

    /// Overwrite only the attributes present in `changes`.
    async fn update_page(&self, page_id: &str, changes: &AttributePatch) -> Result<()>;
}
