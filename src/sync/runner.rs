// ABOUTME: SyncRunner - one fetch, reconcile and write cycle
// ABOUTME: Fetch-stage errors abort before any write; write errors are collected in the report

use std::fmt;
use std::time::Instant;

use super::reader::SinkReader;
use super::reconciler::Reconciler;
use super::writer::{RecordFailure, SinkWriter};
use super::{GameSource, PageSink};
use crate::config::SyncOptions;
use crate::error::Result;
use crate::model::{DecisionPayload, SkipReason, SyncDecision};

/// Counters and failures for one run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub source_records: usize,
    pub sink_pages: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped_unchanged: usize,
    pub skipped_filtered: usize,
    pub skipped_updates_disabled: usize,
    pub skipped_duplicate: usize,
    pub failures: Vec<RecordFailure>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn skipped(&self) -> usize {
        self.skipped_unchanged
            + self.skipped_filtered
            + self.skipped_updates_disabled
            + self.skipped_duplicate
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Check if every planned write succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn count_skips(&mut self, decisions: &[SyncDecision]) {
        for decision in decisions {
            match decision.payload {
                DecisionPayload::Skip(SkipReason::Unchanged) => self.skipped_unchanged += 1,
                DecisionPayload::Skip(SkipReason::Filtered) => self.skipped_filtered += 1,
                DecisionPayload::Skip(SkipReason::UpdatesDisabled) => {
                    self.skipped_updates_disabled += 1
                }
                DecisionPayload::Skip(SkipReason::Duplicate) => self.skipped_duplicate += 1,
                _ => {}
            }
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.dry_run { "[dry run] " } else { "" };
        writeln!(
            f,
            "{}Sync finished in {:.1}s: {} games from Steam, {} pages in Notion",
            prefix,
            self.duration_ms as f64 / 1000.0,
            self.source_records,
            self.sink_pages
        )?;
        writeln!(f, "  created:  {}", self.created)?;
        writeln!(f, "  updated:  {}", self.updated)?;
        writeln!(
            f,
            "  skipped:  {} (unchanged {}, filtered {}, updates disabled {}, duplicate {})",
            self.skipped(),
            self.skipped_unchanged,
            self.skipped_filtered,
            self.skipped_updates_disabled,
            self.skipped_duplicate
        )?;
        write!(f, "  failed:   {}", self.failed())?;
        for failure in &self.failures {
            write!(
                f,
                "\n    - {} {} ({}) [{}]: {}",
                failure.action,
                failure.name,
                failure.external_id,
                failure.error.kind(),
                failure.error
            )?;
        }
        Ok(())
    }
}

/// Runs one synchronization cycle between a source and a sink.
pub struct SyncRunner<'a, G: GameSource + ?Sized, S: PageSink + ?Sized> {
    source: &'a G,
    sink: &'a S,
    options: &'a SyncOptions,
}

impl<'a, G: GameSource + ?Sized, S: PageSink + ?Sized> SyncRunner<'a, G, S> {
    pub fn new(source: &'a G, sink: &'a S, options: &'a SyncOptions) -> Self {
        Self {
            source,
            sink,
            options,
        }
    }

    /// Fetch both sides, decide, then write.
    ///
    /// Any error while fetching is returned before a single write happens.
    /// Errors while writing end up in [`SyncReport::failures`].
    pub async fn run(&self) -> Result<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport {
            dry_run: self.options.dry_run,
            ..SyncReport::default()
        };

        let games = self.source.fetch_games().await?;
        report.source_records = games.len();

        let pages = SinkReader::new(self.sink).read_all().await?;
        report.sink_pages = pages.len();

        let decisions = Reconciler::new(self.options).reconcile(&games, &pages);
        report.count_skips(&decisions);

        if self.options.dry_run {
            for decision in decisions.iter().filter(|d| !d.is_skip()) {
                tracing::info!(
                    "[dry run] would {} {} ({})",
                    decision.action(),
                    decision.name,
                    decision.external_id
                );
                match decision.payload {
                    DecisionPayload::Create { .. } => report.created += 1,
                    DecisionPayload::Update { .. } => report.updated += 1,
                    DecisionPayload::Skip(_) => {}
                }
            }
        } else {
            let outcome = SinkWriter::new(self.sink).apply(&decisions).await;
            report.created = outcome.created;
            report.updated = outcome.updated;
            report.failures = outcome.failures;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Sync complete: {} created, {} updated, {} skipped, {} failed",
            report.created,
            report.updated,
            report.skipped(),
            report.failed()
        );

        Ok(report)
    }
}
