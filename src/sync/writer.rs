// ABOUTME: Sink writer - applies create and update decisions one record at a time
// ABOUTME: Per-record failures are collected and reported, never fatal mid-run

use super::PageSink;
use crate::error::SyncError;
use crate::model::{AppId, DecisionPayload, SyncAction, SyncDecision};

/// A record whose write was rejected or failed.
#[derive(Debug)]
pub struct RecordFailure {
    pub external_id: AppId,
    pub name: String,
    pub action: SyncAction,
    pub error: SyncError,
}

/// Result of applying a decision set.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub created: usize,
    pub updated: usize,
    pub failures: Vec<RecordFailure>,
}

/// Applies decisions to a sink.
pub struct SinkWriter<'a, S: PageSink + ?Sized> {
    sink: &'a S,
}

impl<'a, S: PageSink + ?Sized> SinkWriter<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink }
    }

    /// Apply every non-skip decision in order.
    ///
    /// A failing record is logged and recorded; the remaining records are
    /// still processed.
    pub async fn apply(&self, decisions: &[SyncDecision]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();

        for decision in decisions.iter().filter(|d| !d.is_skip()) {
            let result = match &decision.payload {
                DecisionPayload::Create {
                    attributes,
                    artwork,
                } => {
                    tracing::info!("Creating page for {} ({})", decision.name, decision.external_id);
                    self.sink
                        .create_page(decision.external_id, attributes, artwork)
                        .await
                        .map(|page_id| {
                            tracing::debug!("Created page {} for {}", page_id, decision.name);
                            outcome.created += 1;
                        })
                }
                DecisionPayload::Update { page_id, changes } => {
                    tracing::info!(
                        "Updating {} ({}): {}",
                        decision.name,
                        decision.external_id,
                        changes.changed_fields().join(", ")
                    );
                    self.sink
                        .update_page(page_id, changes)
                        .await
                        .map(|()| outcome.updated += 1)
                }
                DecisionPayload::Skip(_) => Ok(()),
            };

            if let Err(error) = result {
                tracing::error!(
                    "Failed to {} {} ({}): {}",
                    decision.action(),
                    decision.name,
                    decision.external_id,
                    error
                );
                outcome.failures.push(RecordFailure {
                    external_id: decision.external_id,
                    name: decision.name.clone(),
                    action: decision.action(),
                    error,
                });
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncOptions;
    use crate::model::GameRecord;
    use crate::sync::memory::MemorySink;
    use crate::sync::Reconciler;

    #[tokio::test]
    async fn test_apply_creates_and_updates() {
        let sink = MemorySink::new();
        let page_id = sink.insert_record(&GameRecord::new(10, "A", 5));

        let source = vec![GameRecord::new(10, "A", 0), GameRecord::new(11, "B", 90)];
        let options = SyncOptions::default();
        let decisions = Reconciler::new(&options).reconcile(&source, &sink.pages());

        let outcome = SinkWriter::new(&sink).apply(&decisions).await;

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);
        assert!(outcome.failures.is_empty());

        let updated = sink.page_for(10).unwrap();
        assert_eq!(updated.page_id, page_id);
        assert_eq!(updated.stored_attributes.playtime_hours, 0.0);
        assert!(updated.last_synced_timestamp.is_some());
        assert_eq!(sink.page_for(11).unwrap().stored_attributes.name, "B");
    }

    #[tokio::test]
    async fn test_failure_does_not_block_remaining_records() {
        let sink = MemorySink::new();
        sink.reject(11);

        let source = vec![
            GameRecord::new(10, "A", 60),
            GameRecord::new(11, "B", 60),
            GameRecord::new(12, "C", 60),
        ];
        let options = SyncOptions::default();
        let decisions = Reconciler::new(&options).reconcile(&source, &[]);

        let outcome = SinkWriter::new(&sink).apply(&decisions).await;

        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.failures.len(), 1);
        let failure = &outcome.failures[0];
        assert_eq!(failure.external_id, 11);
        assert_eq!(failure.action, SyncAction::Create);
        assert!(matches!(failure.error, SyncError::Validation(_)));
        assert!(sink.page_for(12).is_some());
    }

    #[tokio::test]
    async fn test_skips_are_not_written() {
        let sink = MemorySink::new();
        let record = GameRecord::new(10, "A", 60);
        sink.insert_record(&record);

        let options = SyncOptions::default();
        let decisions = Reconciler::new(&options).reconcile(&[record], &sink.pages());
        let outcome = SinkWriter::new(&sink).apply(&decisions).await;

        assert_eq!(outcome.created + outcome.updated, 0);
        assert_eq!(sink.write_count(), 0);
    }
}
