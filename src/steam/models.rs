// ABOUTME: Wire types for the Steam Web API responses
// ABOUTME: Owned games list, per-game player achievements and store app details

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::model::{AchievementStats, AppId, GameRecord, StoreInfo};

/// Top-level body of `IPlayerService/GetOwnedGames`.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGamesEnvelope {
    pub response: OwnedGamesResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnedGamesResponse {
    #[serde(default)]
    pub game_count: Option<u32>,
    #[serde(default)]
    pub games: Option<Vec<OwnedGame>>,
}

impl OwnedGamesResponse {
    /// Extract the games list.
    ///
    /// Steam answers `{"response": {}}` for private profiles, which is not the
    /// same as an empty library (`game_count: 0`).
    pub fn into_games(self) -> Result<Vec<OwnedGame>, String> {
        match (self.games, self.game_count) {
            (Some(games), _) => Ok(games),
            (None, Some(0)) => Ok(Vec::new()),
            (None, _) => Err(
                "response contains no games list; check that the Steam profile's game details are public"
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGame {
    pub appid: AppId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub rtime_last_played: Option<i64>,
    #[serde(default)]
    pub img_icon_url: Option<String>,
}

impl OwnedGame {
    pub fn into_record(self, is_free_to_play: bool) -> GameRecord {
        GameRecord {
            external_id: self.appid,
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("App {}", self.appid)),
            total_playtime_minutes: self.playtime_forever,
            // 0 means never played
            last_played_timestamp: self.rtime_last_played.filter(|ts| *ts > 0),
            is_free_to_play,
            icon_hash: self.img_icon_url.filter(|h| !h.is_empty()),
            achievements: None,
            store_info: None,
        }
    }
}

/// Combine the base owned-games list with the list that includes played
/// free games.
///
/// Steam has no per-game "free" flag; a game that only shows up in the
/// extended list is free-to-play. Games missing from the extended list are
/// kept as paid, so a library change between the two calls loses nothing.
pub fn merge_free_games(base: Vec<OwnedGame>, extended: Vec<OwnedGame>) -> Vec<GameRecord> {
    let paid: HashSet<AppId> = base.iter().map(|g| g.appid).collect();
    let listed: HashSet<AppId> = extended.iter().map(|g| g.appid).collect();

    let mut records: Vec<GameRecord> = extended
        .into_iter()
        .map(|game| {
            let is_free = !paid.contains(&game.appid);
            game.into_record(is_free)
        })
        .collect();
    records.extend(
        base.into_iter()
            .filter(|game| !listed.contains(&game.appid))
            .map(|game| game.into_record(false)),
    );
    records
}

/// Top-level body of `ISteamUserStats/GetPlayerAchievements`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerAchievementsEnvelope {
    pub playerstats: PlayerStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub achievements: Option<Vec<PlayerAchievement>>,
}

impl PlayerStats {
    /// Games without stats count as zero achievements.
    pub fn stats(&self) -> AchievementStats {
        match (&self.achievements, self.success) {
            (Some(list), true) => AchievementStats {
                total: list.len() as u32,
                achieved: list.iter().filter(|a| a.achieved != 0).count() as u32,
            },
            _ => AchievementStats::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerAchievement {
    pub apiname: String,
    pub achieved: u8,
}

/// Body of the store's `api/appdetails`, keyed by app id.
pub type AppDetailsResponse = HashMap<String, AppDetailsEntry>;

#[derive(Debug, Clone, Deserialize)]
pub struct AppDetailsEntry {
    #[serde(default)]
    pub success: bool,
    /// An object on success; the store sends `[]` when the filters match nothing
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppDetailsData {
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub description: String,
}

impl AppDetailsEntry {
    /// `None` for unknown or delisted apps.
    pub fn into_store_info(self) -> Option<StoreInfo> {
        if !self.success {
            return None;
        }
        let data: AppDetailsData = match self.data {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).ok()?,
            _ => AppDetailsData::default(),
        };
        Some(StoreInfo {
            short_description: data.short_description.trim().to_string(),
            tags: data.genres.into_iter().map(|g| g.description).collect(),
        })
    }
}
