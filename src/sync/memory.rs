// ABOUTME: In-memory source and sink for exercising the engine without network access
// ABOUTME: The sink honors pagination and can be told to reject specific records

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::{GameSource, PageBatch, PageSink};
use crate::error::{Result, SyncError};
use crate::model::{AppId, AttributePatch, GameRecord, PageArtwork, SinkPage, StoredAttributes};

/// A fixed list of games, or a fixed failure.
pub struct MemorySource {
    games: Vec<GameRecord>,
    unauthorized: bool,
    fetches: Mutex<usize>,
}

impl MemorySource {
    pub fn new(games: Vec<GameRecord>) -> Self {
        Self {
            games,
            unauthorized: false,
            fetches: Mutex::new(0),
        }
    }

    /// A source whose credential is always rejected.
    pub fn unauthorized() -> Self {
        Self {
            games: Vec::new(),
            unauthorized: true,
            fetches: Mutex::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl GameSource for MemorySource {
    async fn fetch_games(&self) -> Result<Vec<GameRecord>> {
        *self.fetches.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        if self.unauthorized {
            return Err(SyncError::Auth {
                service: "memory",
                message: "invalid key".to_string(),
            });
        }
        Ok(self.games.clone())
    }
}

#[derive(Default)]
struct SinkState {
    pages: Vec<SinkPage>,
    unkeyed: usize,
    next_page: u64,
    rejected: HashSet<AppId>,
    queries: usize,
    creates: usize,
    updates: usize,
}

/// A database held in memory. Page ids are `page-<n>`.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<SinkState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a page as if a previous run had written `record`.
    pub fn insert_record(&self, record: &GameRecord) -> String {
        self.insert_attributes(record.external_id, StoredAttributes::from_record(record))
    }

    /// Seed a page with explicit stored attributes.
    pub fn insert_attributes(&self, external_id: AppId, attributes: StoredAttributes) -> String {
        let mut state = self.lock();
        state.next_page += 1;
        let page_id = format!("page-{}", state.next_page);
        state.pages.push(SinkPage {
            page_id: page_id.clone(),
            external_id,
            stored_attributes: attributes,
            last_synced_timestamp: None,
        });
        page_id
    }

    /// Seed rows that carry no external id.
    pub fn add_unkeyed(&self, count: usize) {
        self.lock().unkeyed += count;
    }

    /// Make every write for `external_id` fail with a validation error.
    pub fn reject(&self, external_id: AppId) {
        self.lock().rejected.insert(external_id);
    }

    pub fn pages(&self) -> Vec<SinkPage> {
        self.lock().pages.clone()
    }

    pub fn page_for(&self, external_id: AppId) -> Option<SinkPage> {
        self.lock()
            .pages
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned()
    }

    pub fn query_count(&self) -> usize {
        self.lock().queries
    }

    /// Number of creates and updates that reached the sink.
    pub fn write_count(&self) -> usize {
        let state = self.lock();
        state.creates + state.updates
    }
}

#[async_trait]
impl PageSink for MemorySink {
    async fn query_pages(&self, start_cursor: Option<&str>, page_size: usize) -> Result<PageBatch> {
        let mut state = self.lock();
        state.queries += 1;

        let offset = match start_cursor {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                SyncError::Validation(format!("invalid start_cursor: {}", cursor))
            })?,
        };
        let end = (offset + page_size.max(1)).min(state.pages.len());
        let pages = state.pages.get(offset..end).unwrap_or_default().to_vec();

        Ok(PageBatch {
            pages,
            unkeyed: if offset == 0 { state.unkeyed } else { 0 },
            next_cursor: (end < state.pages.len()).then(|| end.to_string()),
        })
    }

    async fn create_page(
        &self,
        external_id: AppId,
        attributes: &StoredAttributes,
        _artwork: &PageArtwork,
    ) -> Result<String> {
        let mut state = self.lock();
        if state.rejected.contains(&external_id) {
            return Err(SyncError::Validation(format!(
                "page for app {} rejected",
                external_id
            )));
        }

        state.creates += 1;
        state.next_page += 1;
        let page_id = format!("page-{}", state.next_page);
        state.pages.push(SinkPage {
            page_id: page_id.clone(),
            external_id,
            stored_attributes: attributes.clone(),
            last_synced_timestamp: Some(Utc::now()),
        });
        Ok(page_id)
    }

    async fn update_page(&self, page_id: &str, changes: &AttributePatch) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .pages
            .iter()
            .position(|p| p.page_id == page_id)
            .ok_or_else(|| SyncError::Api {
                service: "memory",
                status: 404,
                body: format!("page {} not found", page_id),
            })?;

        let external_id = state.pages[index].external_id;
        if state.rejected.contains(&external_id) {
            return Err(SyncError::Validation(format!(
                "page for app {} rejected",
                external_id
            )));
        }

        state.updates += 1;
        let page = &mut state.pages[index];
        page.stored_attributes.apply(changes);
        page.last_synced_timestamp = Some(Utc::now());
        Ok(())
    }
}
