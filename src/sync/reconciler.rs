// ABOUTME: Reconciler - classifies each source game as create, update or skip
// ABOUTME: Joins source records to sink pages by external id, honoring filter and update switches

use std::collections::{HashMap, HashSet};

use crate::config::SyncOptions;
use crate::model::{
    AppId, DecisionPayload, GameRecord, SinkPage, SkipReason, StoredAttributes, SyncDecision,
};

/// Reconciler diffs the source list against the pages already in the sink.
///
/// The external id is the only join key. Decisions come out in source order,
/// and running the reconciler again after the decisions have been applied
/// yields only skips.
pub struct Reconciler<'a> {
    options: &'a SyncOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(options: &'a SyncOptions) -> Self {
        Self { options }
    }

    /// Produce one decision per source record.
    pub fn reconcile(&self, source: &[GameRecord], sink: &[SinkPage]) -> Vec<SyncDecision> {
        let existing = index_pages(sink);
        let mut seen: HashSet<AppId> = HashSet::with_capacity(source.len());

        source
            .iter()
            .map(|record| {
                if !seen.insert(record.external_id) {
                    tracing::warn!(
                        "Duplicate app id {} ({}) in source list, keeping first occurrence",
                        record.external_id,
                        record.name
                    );
                    return skip(record, SkipReason::Duplicate);
                }
                self.decide(record, existing.get(&record.external_id).copied())
            })
            .collect()
    }

    fn decide(&self, record: &GameRecord, page: Option<&SinkPage>) -> SyncDecision {
        if self.options.enable_filter && !self.options.filter.accepts(record) {
            tracing::debug!("{} does not pass the filter rule", record.name);
            return skip(record, SkipReason::Filtered);
        }

        let current = StoredAttributes::from_record(record);

        let Some(page) = page else {
            return SyncDecision {
                external_id: record.external_id,
                name: record.name.clone(),
                payload: DecisionPayload::Create {
                    attributes: current,
                    artwork: record.artwork(),
                },
            };
        };

        let changes = current.diff(&page.stored_attributes);
        if changes.is_empty() {
            return skip(record, SkipReason::Unchanged);
        }
        if !self.options.enable_item_update {
            tracing::debug!(
                "{} differs in {:?} but updates are disabled",
                record.name,
                changes.changed_fields()
            );
            return skip(record, SkipReason::UpdatesDisabled);
        }

        SyncDecision {
            external_id: record.external_id,
            name: record.name.clone(),
            payload: DecisionPayload::Update {
                page_id: page.page_id.clone(),
                changes,
            },
        }
    }
}

/// Map external id to page; the first page wins when the sink holds duplicates.
fn index_pages(sink: &[SinkPage]) -> HashMap<AppId, &SinkPage> {
    let mut index: HashMap<AppId, &SinkPage> = HashMap::with_capacity(sink.len());
    for page in sink {
        if let Some(first) = index.get(&page.external_id) {
            tracing::warn!(
                "App id {} appears on pages {} and {}; only {} will be updated",
                page.external_id,
                first.page_id,
                page.page_id,
                first.page_id
            );
            continue;
        }
        index.insert(page.external_id, page);
    }
    index
}

fn skip(record: &GameRecord, reason: SkipReason) -> SyncDecision {
    SyncDecision {
        external_id: record.external_id,
        name: record.name.clone(),
        payload: DecisionPayload::Skip(reason),
    }
}
