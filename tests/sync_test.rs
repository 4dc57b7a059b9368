// ABOUTME: End-to-end tests of the sync engine against the in-memory source and sink
// ABOUTME: Covers idempotence, uniqueness, filtering, update gating and partial failures

use std::collections::HashSet;

use steam_notion_sync::config::SyncOptions;
use steam_notion_sync::model::{
    AchievementStats, DecisionPayload, GameRecord, SkipReason, StoredAttributes, SyncAction,
};
use steam_notion_sync::sync::memory::{MemorySink, MemorySource};
use steam_notion_sync::sync::{Reconciler, SinkReader, SyncRunner};
use steam_notion_sync::SyncError;

fn library() -> Vec<GameRecord> {
    let mut portal = GameRecord::new(620, "Portal 2", 738);
    portal.last_played_timestamp = Some(1_700_000_000);
    portal.icon_hash = Some("2e478fc6874d06ae5baf0d147f6f21203291aa02".to_string());
    portal.achievements = Some(AchievementStats {
        total: 51,
        achieved: 37,
    });

    let mut tf2 = GameRecord::new(440, "Team Fortress 2", 12_000);
    tf2.is_free_to_play = true;
    tf2.last_played_timestamp = Some(1_650_000_000);

    let unplayed = GameRecord::new(70, "Half-Life", 0);

    vec![portal, tf2, unplayed]
}

#[tokio::test]
async fn test_second_run_is_all_skip() {
    let source = MemorySource::new(library());
    let sink = MemorySink::new();
    let options = SyncOptions::default();

    let first = SyncRunner::new(&source, &sink, &options).run().await.unwrap();
    assert_eq!(first.created, 3);
    assert!(first.is_success());

    let second = SyncRunner::new(&source, &sink, &options).run().await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.skipped_unchanged, 3);

    let pages = SinkReader::new(&sink).read_all().await.unwrap();
    let decisions = Reconciler::new(&options).reconcile(&library(), &pages);
    assert!(decisions.iter().all(|d| d.action() == SyncAction::Skip));
}

#[tokio::test]
async fn test_external_ids_stay_unique() {
    let mut games = library();
    games.push(GameRecord::new(620, "Portal 2 (duplicate entry)", 1));
    games.push(GameRecord::new(70, "Half-Life", 0));

    let source = MemorySource::new(games);
    let sink = MemorySink::new();
    sink.insert_record(&GameRecord::new(440, "Team Fortress 2", 10));
    let options = SyncOptions::default();

    let report = SyncRunner::new(&source, &sink, &options).run().await.unwrap();
    assert_eq!(report.skipped_duplicate, 2);

    let pages = sink.pages();
    let ids: HashSet<u64> = pages.iter().map(|p| p.external_id).collect();
    assert_eq!(ids.len(), pages.len());
    assert_eq!(pages.len(), 3);
    assert_eq!(sink.page_for(620).unwrap().stored_attributes.name, "Portal 2");
}

#[tokio::test]
async fn test_filter_never_creates_or_updates_rejected_games() {
    let source = MemorySource::new(library());
    let sink = MemorySink::new();
    // Stale entry for the unplayed game, with different attributes
    sink.insert_record(&GameRecord::new(70, "Half-Life", 30));
    let options = SyncOptions {
        enable_filter: true,
        ..SyncOptions::default()
    };

    let report = SyncRunner::new(&source, &sink, &options).run().await.unwrap();

    assert_eq!(report.skipped_filtered, 1);
    assert_eq!(report.created, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(
        sink.page_for(70).unwrap().stored_attributes.playtime_hours,
        0.5
    );
}

#[tokio::test]
async fn test_update_gating() {
    let source = MemorySource::new(library());
    let sink = MemorySink::new();
    for game in library() {
        let mut stale = game.clone();
        stale.total_playtime_minutes += 600;
        sink.insert_record(&stale);
    }
    let options = SyncOptions {
        enable_item_update: false,
        ..SyncOptions::default()
    };

    let report = SyncRunner::new(&source, &sink, &options).run().await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped_updates_disabled, 3);
    assert_eq!(sink.write_count(), 0);

    let enabled = SyncOptions::default();
    let report = SyncRunner::new(&source, &sink, &enabled).run().await.unwrap();
    assert_eq!(report.updated, 3);
}

#[test]
fn test_scenarios() {
    let options = SyncOptions::default();
    let filtered = SyncOptions {
        enable_filter: true,
        ..SyncOptions::default()
    };
    let source = vec![GameRecord::new(10, "A", 0)];

    // Empty sink, filter off: create
    let decisions = Reconciler::new(&options).reconcile(&source, &[]);
    assert_eq!(decisions[0].action(), SyncAction::Create);
    assert_eq!(decisions[0].external_id, 10);

    // Sink holds playtime 5, updates on: update to 0
    let sink = MemorySink::new();
    sink.insert_record(&GameRecord::new(10, "A", 5));
    let decisions = Reconciler::new(&options).reconcile(&source, &sink.pages());
    match &decisions[0].payload {
        DecisionPayload::Update { changes, .. } => {
            assert_eq!(changes.playtime_hours, Some(0.0));
        }
        other => panic!("expected update, got {:?}", other),
    }

    // Filter on, playtime 0: skip
    let decisions = Reconciler::new(&filtered).reconcile(&source, &[]);
    assert_eq!(
        decisions[0].payload,
        DecisionPayload::Skip(SkipReason::Filtered)
    );
}

#[tokio::test]
async fn test_partial_failure_is_reported() {
    let source = MemorySource::new(library());
    let sink = MemorySink::new();
    sink.reject(440);
    let options = SyncOptions::default();

    let report = SyncRunner::new(&source, &sink, &options).run().await.unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());
    assert_eq!(report.failures[0].external_id, 440);
    assert!(matches!(
        report.failures[0].error,
        SyncError::Validation(_)
    ));
    assert!(sink.page_for(620).is_some());
    assert!(sink.page_for(70).is_some());
    assert!(sink.page_for(440).is_none());
}

#[tokio::test]
async fn test_fatal_source_error_writes_nothing() {
    let source = MemorySource::unauthorized();
    let sink = MemorySink::new();
    sink.insert_record(&GameRecord::new(10, "A", 5));
    let options = SyncOptions::default();

    let result = SyncRunner::new(&source, &sink, &options).run().await;

    assert!(matches!(result, Err(SyncError::Auth { .. })));
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(sink.write_count(), 0);
}

#[tokio::test]
async fn test_unkeyed_pages_are_ignored() {
    let source = MemorySource::new(vec![GameRecord::new(10, "A", 60)]);
    let sink = MemorySink::new();
    sink.add_unkeyed(2);
    let options = SyncOptions::default();

    let report = SyncRunner::new(&source, &sink, &options).run().await.unwrap();
    assert_eq!(report.sink_pages, 0);
    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn test_update_preserves_page_id_and_untouched_fields() {
    let mut stored = GameRecord::new(620, "Portal 2", 600);
    stored.achievements = Some(AchievementStats {
        total: 51,
        achieved: 10,
    });
    let sink = MemorySink::new();
    let page_id = sink.insert_record(&stored);

    // Source without achievement data, more playtime
    let source = MemorySource::new(vec![GameRecord::new(620, "Portal 2", 738)]);
    let options = SyncOptions::default();
    let report = SyncRunner::new(&source, &sink, &options).run().await.unwrap();
    assert_eq!(report.updated, 1);

    let page = sink.page_for(620).unwrap();
    assert_eq!(page.page_id, page_id);
    assert_eq!(page.stored_attributes.playtime_hours, 12.3);
    assert_eq!(
        page.stored_attributes.achievements,
        StoredAttributes::from_record(&stored).achievements
    );
}
