// ABOUTME: Run configuration passed explicitly into every component
// ABOUTME: Credentials, sync options, filter thresholds, retry policy and property mapping

use crate::error::{Result, SyncError};
use crate::model::{GameRecord, StoredAttributes};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_STEAM_API_URL: &str = "https://api.steampowered.com";
pub const DEFAULT_STEAM_STORE_URL: &str = "https://store.steampowered.com";
pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Credentials and options for the Steam Web API.
#[derive(Debug, Clone)]
pub struct SteamConfig {
    pub api_base_url: String,
    /// Public store API, used for descriptions and genres
    pub store_base_url: String,
    pub api_key: String,
    pub user_id: String,
    pub include_played_free_games: bool,
    pub include_achievements: bool,
    pub include_store_info: bool,
}

impl SteamConfig {
    pub fn new(api_key: String, user_id: String) -> Self {
        Self {
            api_base_url: DEFAULT_STEAM_API_URL.to_string(),
            store_base_url: DEFAULT_STEAM_STORE_URL.to_string(),
            api_key,
            user_id,
            include_played_free_games: true,
            include_achievements: false,
            include_store_info: false,
        }
    }
}

/// Credentials and target for the Notion API.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub database_id: String,
    pub properties: PropertyMapping,
}

impl NotionConfig {
    pub fn new(api_key: String, database_id: String) -> Self {
        Self {
            api_base_url: DEFAULT_NOTION_API_URL.to_string(),
            api_key,
            database_id,
            properties: PropertyMapping::default(),
        }
    }
}

/// Notion property names for each stored attribute.
///
/// `title`, `app_id`, `playtime` and `last_played` are required; any other
/// entry may be set to an empty string to leave that attribute out of the
/// database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyMapping {
    pub title: String,
    pub app_id: String,
    pub playtime: String,
    pub last_played: String,
    pub store_url: String,
    pub free_to_play: String,
    pub total_achievements: String,
    pub achieved_achievements: String,
    pub completion: String,
    pub description: String,
    pub tags: String,
    pub last_synced: String,
}

impl Default for PropertyMapping {
    fn default() -> Self {
        Self {
            title: "Name".to_string(),
            app_id: "App ID".to_string(),
            playtime: "Playtime (h)".to_string(),
            last_played: "Last Played".to_string(),
            store_url: "Store URL".to_string(),
            free_to_play: "Free to Play".to_string(),
            total_achievements: "Total Achievements".to_string(),
            achieved_achievements: "Achieved Achievements".to_string(),
            completion: "Completion".to_string(),
            description: "Description".to_string(),
            tags: "Tags".to_string(),
            last_synced: "Last Synced".to_string(),
        }
    }
}

impl PropertyMapping {
    /// Expected Notion property type for every enabled property.
    pub fn expected_types(&self) -> Vec<(&str, &'static str)> {
        [
            (self.title.as_str(), "title"),
            (self.app_id.as_str(), "number"),
            (self.playtime.as_str(), "number"),
            (self.last_played.as_str(), "date"),
            (self.store_url.as_str(), "url"),
            (self.free_to_play.as_str(), "checkbox"),
            (self.total_achievements.as_str(), "number"),
            (self.achieved_achievements.as_str(), "number"),
            (self.completion.as_str(), "number"),
            (self.description.as_str(), "rich_text"),
            (self.tags.as_str(), "multi_select"),
            (self.last_synced.as_str(), "date"),
        ]
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        for (key, name) in [
            ("title", &self.title),
            ("app_id", &self.app_id),
            ("playtime", &self.playtime),
            ("last_played", &self.last_played),
        ] {
            if name.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "property mapping: '{}' must not be empty",
                    key
                )));
            }
        }
        let names: Vec<&str> = self.expected_types().into_iter().map(|(n, _)| n).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(SyncError::Config(format!(
                    "property mapping: '{}' is mapped more than once",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Thresholds deciding whether a game is worth recording.
///
/// A game is rejected when it has (almost) no playtime and no achievements,
/// or when it was last played before `stale_before` with little playtime and
/// no achievements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterRule {
    pub min_playtime_hours: f64,
    pub stale_before: NaiveDate,
    pub stale_min_playtime_hours: f64,
}

impl Default for FilterRule {
    fn default() -> Self {
        Self {
            min_playtime_hours: 0.1,
            stale_before: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            stale_min_playtime_hours: 6.0,
        }
    }
}

impl FilterRule {
    /// Returns true if the record should be synchronized.
    pub fn accepts(&self, record: &GameRecord) -> bool {
        let attrs = StoredAttributes::from_record(record);
        let achievements = record.achievements.map(|a| a.total).unwrap_or(0);
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
        let last_played = attrs.last_played.unwrap_or(epoch);

        let idle = attrs.playtime_hours < self.min_playtime_hours && achievements < 1;
        let stale = last_played < self.stale_before
            && achievements < 1
            && attrs.playtime_hours < self.stale_min_playtime_hours;

        !(idle || stale)
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Behavior switches for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub enable_item_update: bool,
    pub enable_filter: bool,
    pub filter: FilterRule,
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            enable_item_update: true,
            enable_filter: false,
            filter: FilterRule::default(),
            dry_run: false,
        }
    }
}

/// Everything a run needs, built once and handed to each component.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub steam: SteamConfig,
    pub notion: NotionConfig,
    pub options: SyncOptions,
    pub retry: RetryPolicy,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.steam.api_key.trim().is_empty() {
            return Err(SyncError::Config("Steam API key is required".to_string()));
        }
        if self.steam.user_id.trim().is_empty() {
            return Err(SyncError::Config("Steam user id is required".to_string()));
        }
        if self.notion.api_key.trim().is_empty() {
            return Err(SyncError::Config("Notion API key is required".to_string()));
        }
        if self.notion.database_id.trim().is_empty() {
            return Err(SyncError::Config(
                "Notion database id is required".to_string(),
            ));
        }
        let properties = &self.notion.properties;
        properties.validate()?;
        if self.steam.include_achievements
            && (properties.total_achievements.is_empty() || properties.achieved_achievements.is_empty())
        {
            return Err(SyncError::Config(
                "achievement fetching needs both achievement properties mapped".to_string(),
            ));
        }
        if self.steam.include_store_info
            && (properties.description.is_empty() || properties.tags.is_empty())
        {
            return Err(SyncError::Config(
                "store info fetching needs the description and tags properties mapped".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay settings from an optional TOML file.
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(properties) = file.properties {
            self.notion.properties = properties;
        }
        if let Some(filter) = file.filter {
            self.options.filter = filter;
        }
        if let Some(retry) = file.retry {
            if let Some(max_retries) = retry.max_retries {
                self.retry.max_retries = max_retries;
            }
            if let Some(ms) = retry.initial_delay_ms {
                self.retry.initial_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = retry.max_delay_ms {
                self.retry.max_delay = Duration::from_millis(ms);
            }
        }
        if let Some(url) = file.steam_api_url {
            self.steam.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = file.steam_store_url {
            self.steam.store_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = file.notion_api_url {
            self.notion.api_base_url = url.trim_end_matches('/').to_string();
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// Contents of the optional `--config` TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub steam_api_url: Option<String>,
    pub steam_store_url: Option<String>,
    pub notion_api_url: Option<String>,
    pub properties: Option<PropertyMapping>,
    pub filter: Option<FilterRule>,
    pub retry: Option<RetrySettings>,
}

impl FileConfig {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SyncError::Config(format!("invalid config file: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AchievementStats;

    fn config() -> SyncConfig {
        SyncConfig {
            steam: SteamConfig::new("key".to_string(), "7656".to_string()),
            notion: NotionConfig::new("secret".to_string(), "db".to_string()),
            options: SyncOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let steam = SteamConfig::new("k".to_string(), "u".to_string());
        assert!(steam.include_played_free_games);
        assert!(!steam.include_achievements);
        assert!(!steam.include_store_info);
        assert_eq!(steam.store_base_url, DEFAULT_STEAM_STORE_URL);

        let options = SyncOptions::default();
        assert!(options.enable_item_update);
        assert!(!options.enable_filter);
        assert!(!options.dry_run);
    }

    #[test]
    fn test_validate_missing_credentials() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());

        cfg.notion.api_key = " ".to_string();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_achievements_need_mapped_columns() {
        let mut cfg = config();
        cfg.steam.include_achievements = true;
        assert!(cfg.validate().is_ok());

        cfg.notion.properties.achieved_achievements = String::new();
        assert!(matches!(cfg.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_store_info_needs_mapped_columns() {
        let mut cfg = config();
        cfg.steam.include_store_info = true;
        assert!(cfg.validate().is_ok());

        cfg.notion.properties.tags = String::new();
        assert!(matches!(cfg.validate(), Err(SyncError::Config(_))));

        cfg.steam.include_store_info = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_mapping_rejects_duplicates() {
        let mapping = PropertyMapping {
            completion: "Playtime (h)".to_string(),
            ..PropertyMapping::default()
        };
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_mapping_disabled_properties() {
        let mapping = PropertyMapping {
            total_achievements: String::new(),
            achieved_achievements: String::new(),
            completion: String::new(),
            ..PropertyMapping::default()
        };
        assert!(mapping.validate().is_ok());
        assert_eq!(mapping.expected_types().len(), 9);
        assert!(mapping.expected_types().contains(&("Free to Play", "checkbox")));
        assert!(mapping.expected_types().contains(&("Tags", "multi_select")));
    }

    #[test]
    fn test_file_config_overlay() {
        let file = FileConfig::parse(
            r#"
            notion_api_url = "http://localhost:9000/"
            steam_store_url = "http://localhost:9001/"

            [properties]
            title = "游戏名称"
            playtime = "游玩时长 (h)"

            [filter]
            min_playtime_hours = 1.0

            [retry]
            max_retries = 2
            initial_delay_ms = 10
            "#,
        )
        .unwrap();

        let mut cfg = config();
        cfg.apply_file(file);

        assert_eq!(cfg.notion.api_base_url, "http://localhost:9000");
        assert_eq!(cfg.steam.store_base_url, "http://localhost:9001");
        assert_eq!(cfg.notion.properties.title, "游戏名称");
        assert_eq!(cfg.notion.properties.app_id, "App ID");
        assert_eq!(cfg.options.filter.min_playtime_hours, 1.0);
        assert_eq!(cfg.options.filter.stale_min_playtime_hours, 6.0);
        assert_eq!(cfg.retry.max_retries, 2);
        assert_eq!(cfg.retry.initial_delay, Duration::from_millis(10));
        assert_eq!(cfg.retry.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_file_config_unknown_key() {
        let err = FileConfig::parse("[properties]\nunknown = \"x\"").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_filter_rule() {
        let rule = FilterRule::default();

        let unplayed = GameRecord::new(10, "A", 0);
        assert!(!rule.accepts(&unplayed));

        let mut with_achievements = GameRecord::new(11, "B", 0);
        with_achievements.achievements = Some(AchievementStats {
            total: 12,
            achieved: 0,
        });
        assert!(rule.accepts(&with_achievements));

        // 3h, last played 2019: stale
        let mut old = GameRecord::new(12, "C", 180);
        old.last_played_timestamp = Some(1_546_300_800);
        assert!(!rule.accepts(&old));

        // same playtime, played recently
        let mut recent = old.clone();
        recent.last_played_timestamp = Some(1_700_000_000);
        assert!(rule.accepts(&recent));

        // long playtime survives even when stale
        let mut veteran = GameRecord::new(13, "D", 600);
        veteran.last_played_timestamp = Some(1_546_300_800);
        assert!(rule.accepts(&veteran));
    }
}
