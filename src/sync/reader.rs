// ABOUTME: Sink reader - walks every page of the destination database
// ABOUTME: Pagination is a restartable cursor that yields batches until exhausted

use super::{PageBatch, PageSink};
use crate::error::Result;
use crate::model::SinkPage;

/// Page size used for database queries (Notion's maximum).
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Position in a paginated sink query.
///
/// A cursor yields batches until the sink reports no further results. It can
/// be restarted to walk the same sequence again from the first batch.
#[derive(Debug, Clone)]
pub struct PageCursor {
    next_cursor: Option<String>,
    page_size: usize,
    exhausted: bool,
    batches_read: usize,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            next_cursor: None,
            page_size: page_size.max(1),
            exhausted: false,
            batches_read: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn batches_read(&self) -> usize {
        self.batches_read
    }

    /// Rewind to the first batch.
    pub fn restart(&mut self) {
        self.next_cursor = None;
        self.exhausted = false;
        self.batches_read = 0;
    }

    /// Fetch the next batch, or `None` once the sequence is exhausted.
    pub async fn fetch_batch<S>(&mut self, sink: &S) -> Result<Option<PageBatch>>
    where
        S: PageSink + ?Sized,
    {
        if self.exhausted {
            return Ok(None);
        }

        let batch = sink
            .query_pages(self.next_cursor.as_deref(), self.page_size)
            .await?;

        self.batches_read += 1;
        match batch.next_cursor {
            Some(ref cursor) => self.next_cursor = Some(cursor.clone()),
            None => {
                self.next_cursor = None;
                self.exhausted = true;
            }
        }

        Ok(Some(batch))
    }
}

/// Reads all existing pages from a sink.
pub struct SinkReader<'a, S: PageSink + ?Sized> {
    sink: &'a S,
    page_size: usize,
}

impl<'a, S: PageSink + ?Sized> SinkReader<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self {
            sink,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// A fresh cursor over the sink's pages.
    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.page_size)
    }

    /// Collect every keyed page, following the cursor until exhausted.
    pub async fn read_all(&self) -> Result<Vec<SinkPage>> {
        let mut cursor = self.cursor();
        let mut pages = Vec::new();
        let mut unkeyed = 0;

        while let Some(batch) = cursor.fetch_batch(self.sink).await? {
            tracing::debug!(
                "Read batch {} with {} pages",
                cursor.batches_read(),
                batch.pages.len()
            );
            unkeyed += batch.unkeyed;
            pages.extend(batch.pages);
        }

        if unkeyed > 0 {
            tracing::warn!(
                "Ignored {} database pages without an app id; they will not be matched",
                unkeyed
            );
        }
        tracing::info!(
            "Read {} existing pages in {} batches",
            pages.len(),
            cursor.batches_read()
        );

        Ok(pages)
    }
}
