// ABOUTME: Core data model for game synchronization
// ABOUTME: Source records, sink pages, stored attribute projections and sync decisions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Steam application id, the join key between source and sink.
pub type AppId = u64;

/// Achievement counters for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AchievementStats {
    pub total: u32,
    pub achieved: u32,
}

impl AchievementStats {
    /// Completion percentage rounded to one decimal, `None` for games without achievements.
    pub fn completion(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(round_one_decimal(
            f64::from(self.achieved) / f64::from(self.total) * 100.0,
        ))
    }
}

/// Store page details for one game.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreInfo {
    pub short_description: String,
    /// Genre names as listed on the store page
    pub tags: Vec<String>,
}

/// Longest text Notion accepts in a single rich text object.
pub const MAX_TEXT_LEN: usize = 2000;

/// A game as reported by the remote source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub external_id: AppId,
    pub name: String,
    pub total_playtime_minutes: u64,
    /// Unix timestamp of the last session; `None` if never played
    pub last_played_timestamp: Option<i64>,
    pub is_free_to_play: bool,
    pub icon_hash: Option<String>,
    /// `None` when achievements were not requested or could not be fetched
    pub achievements: Option<AchievementStats>,
    /// `None` when store details were not requested or could not be fetched
    pub store_info: Option<StoreInfo>,
}

impl GameRecord {
    pub fn new(external_id: AppId, name: impl Into<String>, total_playtime_minutes: u64) -> Self {
        Self {
            external_id,
            name: name.into(),
            total_playtime_minutes,
            last_played_timestamp: None,
            is_free_to_play: false,
            icon_hash: None,
            achievements: None,
            store_info: None,
        }
    }

    pub fn playtime_hours(&self) -> f64 {
        playtime_hours(self.total_playtime_minutes)
    }

    pub fn last_played_date(&self) -> Option<NaiveDate> {
        self.last_played_timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive())
    }

    pub fn store_url(&self) -> String {
        format!("https://store.steampowered.com/app/{}", self.external_id)
    }

    pub fn artwork(&self) -> PageArtwork {
        PageArtwork {
            cover_url: format!(
                "https://steamcdn-a.akamaihd.net/steam/apps/{}/header.jpg",
                self.external_id
            ),
            icon_url: self
                .icon_hash
                .as_deref()
                .filter(|hash| !hash.is_empty())
                .map(|hash| {
                    format!(
                        "https://media.steampowered.com/steamcommunity/public/images/apps/{}/{}.jpg",
                        self.external_id, hash
                    )
                }),
        }
    }
}

/// Minutes to hours, rounded to one decimal the way the sink stores them.
pub fn playtime_hours(minutes: u64) -> f64 {
    round_one_decimal(minutes as f64 / 60.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Cut text to what a single rich text object can hold.
fn truncate_text(text: &str) -> String {
    text.chars().take(MAX_TEXT_LEN).collect()
}

/// Multi-select option names may not contain commas.
fn tag_name(tag: &str) -> String {
    tag.replace(',', " ").trim().to_string()
}

/// Page cover and icon, set when a page is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtwork {
    pub cover_url: String,
    pub icon_url: Option<String>,
}

/// The projection of a game that is persisted in the sink.
///
/// Comparison happens in this representation so that precision lost by the
/// sink (hours instead of minutes, dates instead of timestamps) never causes
/// spurious updates. Optional fields are `None` when the value is unknown:
/// not fetched on the source side, or not held by the sink.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredAttributes {
    pub name: String,
    pub playtime_hours: f64,
    pub last_played: Option<NaiveDate>,
    pub store_url: String,
    pub free_to_play: Option<bool>,
    pub achievements: Option<AchievementStats>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl StoredAttributes {
    pub fn from_record(record: &GameRecord) -> Self {
        Self {
            name: record.name.clone(),
            playtime_hours: record.playtime_hours(),
            last_played: record.last_played_date(),
            store_url: record.store_url(),
            free_to_play: Some(record.is_free_to_play),
            achievements: record.achievements,
            description: record
                .store_info
                .as_ref()
                .map(|info| truncate_text(&info.short_description)),
            tags: record.store_info.as_ref().map(|info| {
                info.tags
                    .iter()
                    .map(|tag| tag_name(tag))
                    .filter(|tag| !tag.is_empty())
                    .collect()
            }),
        }
    }

    /// Fields of `self` that differ from what the sink currently holds.
    ///
    /// Achievements and store details only take part when `self` carries
    /// them, so a run without that data never clears values written earlier.
    /// The free-to-play flag is compared only when the sink holds one.
    pub fn diff(&self, stored: &StoredAttributes) -> AttributePatch {
        let mut patch = AttributePatch::default();

        if self.name != stored.name {
            patch.name = Some(self.name.clone());
        }
        if (self.playtime_hours - stored.playtime_hours).abs() > 0.01 {
            patch.playtime_hours = Some(self.playtime_hours);
        }
        if self.last_played != stored.last_played {
            patch.last_played = Some(self.last_played);
        }
        if self.store_url != stored.store_url {
            patch.store_url = Some(self.store_url.clone());
        }
        if let (Some(current), Some(held)) = (self.free_to_play, stored.free_to_play) {
            if current != held {
                patch.free_to_play = Some(current);
            }
        }
        if let Some(current) = self.achievements {
            if stored.achievements != Some(current) {
                patch.achievements = Some(current);
            }
        }
        if let Some(ref current) = self.description {
            if stored.description.as_ref() != Some(current) {
                patch.description = Some(current.clone());
            }
        }
        if let Some(ref current) = self.tags {
            if stored.tags.as_ref() != Some(current) {
                patch.tags = Some(current.clone());
            }
        }

        patch
    }

    /// Apply a patch in place, mirroring what an update does to a page.
    pub fn apply(&mut self, patch: &AttributePatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(hours) = patch.playtime_hours {
            self.playtime_hours = hours;
        }
        if let Some(last_played) = patch.last_played {
            self.last_played = last_played;
        }
        if let Some(ref url) = patch.store_url {
            self.store_url = url.clone();
        }
        if let Some(flag) = patch.free_to_play {
            self.free_to_play = Some(flag);
        }
        if let Some(stats) = patch.achievements {
            self.achievements = Some(stats);
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(ref tags) = patch.tags {
            self.tags = Some(tags.clone());
        }
    }
}

/// The changed subset of [`StoredAttributes`]. `None` means "leave as is".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributePatch {
    pub name: Option<String>,
    pub playtime_hours: Option<f64>,
    /// `Some(None)` clears the date
    pub last_played: Option<Option<NaiveDate>>,
    pub store_url: Option<String>,
    pub free_to_play: Option<bool>,
    pub achievements: Option<AchievementStats>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl AttributePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.playtime_hours.is_none()
            && self.last_played.is_none()
            && self.store_url.is_none()
            && self.free_to_play.is_none()
            && self.achievements.is_none()
            && self.description.is_none()
            && self.tags.is_none()
    }

    /// Names of the changed fields, for logging.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.playtime_hours.is_some() {
            fields.push("playtime");
        }
        if self.last_played.is_some() {
            fields.push("last_played");
        }
        if self.store_url.is_some() {
            fields.push("store_url");
        }
        if self.free_to_play.is_some() {
            fields.push("free_to_play");
        }
        if self.achievements.is_some() {
            fields.push("achievements");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        fields
    }
}

/// A page that already exists in the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkPage {
    pub page_id: String,
    pub external_id: AppId,
    pub stored_attributes: StoredAttributes,
    pub last_synced_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncAction {
    Create,
    Update,
    Skip,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Create => write!(f, "create"),
            SyncAction::Update => write!(f, "update"),
            SyncAction::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Rejected by the filter rule
    Filtered,
    /// Sink already matches the source
    Unchanged,
    /// Sink differs but updates are disabled
    UpdatesDisabled,
    /// Repeated external id in the source list
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Filtered => write!(f, "filtered"),
            SkipReason::Unchanged => write!(f, "unchanged"),
            SkipReason::UpdatesDisabled => write!(f, "updates disabled"),
            SkipReason::Duplicate => write!(f, "duplicate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionPayload {
    Create {
        attributes: StoredAttributes,
        artwork: PageArtwork,
    },
    Update {
        page_id: String,
        changes: AttributePatch,
    },
    Skip(SkipReason),
}

/// What to do with one game in this run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDecision {
    pub external_id: AppId,
    pub name: String,
    pub payload: DecisionPayload,
}

impl SyncDecision {
    pub fn action(&self) -> SyncAction {
        match self.payload {
            DecisionPayload::Create { .. } => SyncAction::Create,
            DecisionPayload::Update { .. } => SyncAction::Update,
            DecisionPayload::Skip(_) => SyncAction::Skip,
        }
    }

    pub fn is_skip(&self) -> bool {
        self.action() == SyncAction::Skip
    }
}
