// ABOUTME: HTTP client for the Steam Web API
// ABOUTME: Fetches the owned-games list plus optional achievement statistics and store details

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::models::{
    merge_free_games, AppDetailsResponse, OwnedGame, OwnedGamesEnvelope,
    PlayerAchievementsEnvelope,
};
use crate::config::{RetryPolicy, SteamConfig};
use crate::error::{Result, SyncError};
use crate::model::{AchievementStats, AppId, GameRecord, StoreInfo};
use crate::sync::GameSource;
use crate::utils::{parse_retry_after, retry_with_backoff};

const SERVICE: &str = "steam";

/// Steam Web API client bound to one account.
pub struct SteamClient {
    client: Client,
    config: SteamConfig,
    retry: RetryPolicy,
}

impl SteamClient {
    pub fn new(config: SteamConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: SteamConfig {
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                store_base_url: config.store_base_url.trim_end_matches('/').to_string(),
                ..config
            },
            retry,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }

    /// Send one GET request and return the status with the raw body.
    ///
    /// 400 is handed back to the caller, which knows whether it is an error.
    async fn get(
        &self,
        base_url: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| SyncError::from_transport(SERVICE, e))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers().get(reqwest::header::RETRY_AFTER));
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::from_transport(SERVICE, e))?;

        if !status.is_success() && status != StatusCode::BAD_REQUEST {
            return Err(SyncError::from_status(SERVICE, status, body, retry_after));
        }

        Ok((status, body))
    }

    /// Fetch the owned-games list in one call.
    ///
    /// With `include_played_free_games`, free titles the account has played
    /// are part of the answer as well.
    pub async fn get_owned_games(&self, include_played_free_games: bool) -> Result<Vec<OwnedGame>> {
        let mut params = vec![
            ("key", self.config.api_key.clone()),
            ("steamid", self.config.user_id.clone()),
            ("include_appinfo", "true".to_string()),
            ("format", "json".to_string()),
        ];
        if include_played_free_games {
            params.push(("include_played_free_games", "true".to_string()));
        }

        let params = &params;
        let (status, body) = retry_with_backoff("Fetching Steam library", &self.retry, || async move {
            self.get(
                &self.config.api_base_url,
                "/IPlayerService/GetOwnedGames/v0001/",
                params,
            )
            .await
        })
        .await?;

        if status == StatusCode::BAD_REQUEST {
            return Err(SyncError::from_status(SERVICE, status, body, None));
        }

        let envelope: OwnedGamesEnvelope = parse_body(&body)?;
        envelope
            .response
            .into_games()
            .map_err(|message| SyncError::Format {
                service: SERVICE,
                message,
            })
    }

    /// Count total and unlocked achievements for one game.
    ///
    /// Steam answers 400 with `success: false` for games without stats; that
    /// is reported as zero achievements rather than an error.
    pub async fn get_achievement_stats(&self, appid: AppId) -> Result<AchievementStats> {
        let params = vec![
            ("key", self.config.api_key.clone()),
            ("steamid", self.config.user_id.clone()),
            ("appid", appid.to_string()),
        ];

        let params = &params;
        let (_, body) = retry_with_backoff("Fetching achievements", &self.retry, || async move {
            self.get(
                &self.config.api_base_url,
                "/ISteamUserStats/GetPlayerAchievements/v0001/",
                params,
            )
            .await
        })
        .await?;

        let envelope: PlayerAchievementsEnvelope = parse_body(&body)?;
        if let Some(ref reason) = envelope.playerstats.error {
            tracing::debug!("App {} has no achievement data: {}", appid, reason);
        }
        Ok(envelope.playerstats.stats())
    }

    /// Short description and genres from the public store API.
    ///
    /// Returns `None` for apps the store does not know (delisted, region
    /// locked, tools).
    pub async fn get_store_info(&self, appid: AppId) -> Result<Option<StoreInfo>> {
        let params = vec![
            ("appids", appid.to_string()),
            ("filters", "basic,genres".to_string()),
        ];

        let params = &params;
        let (status, body) = retry_with_backoff("Fetching store details", &self.retry, || async move {
            self.get(&self.config.store_base_url, "/api/appdetails", params)
                .await
        })
        .await?;

        if status == StatusCode::BAD_REQUEST {
            return Err(SyncError::from_status(SERVICE, status, body, None));
        }

        let mut details: AppDetailsResponse = parse_body(&body)?;
        Ok(details
            .remove(&appid.to_string())
            .and_then(|entry| entry.into_store_info()))
    }

    /// Fetch the full library as [`GameRecord`]s.
    ///
    /// The API has no per-game "free" flag, so when played free games are
    /// requested the base list is fetched first; anything that only shows up
    /// in the extended list is marked free-to-play.
    pub async fn fetch_library(&self) -> Result<Vec<GameRecord>> {
        tracing::info!("Fetching owned games from Steam...");

        let base = self.get_owned_games(false).await?;
        let mut records: Vec<GameRecord> = if self.config.include_played_free_games {
            let extended = self.get_owned_games(true).await?;
            merge_free_games(base, extended)
        } else {
            base.into_iter().map(|game| game.into_record(false)).collect()
        };

        tracing::info!("Fetched {} games from Steam", records.len());

        if self.config.include_achievements {
            for record in records.iter_mut() {
                match self.get_achievement_stats(record.external_id).await {
                    Ok(stats) => record.achievements = Some(stats),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to fetch achievements for {} ({}): {}",
                            record.name,
                            record.external_id,
                            e
                        );
                    }
                }
            }
        }

        if self.config.include_store_info {
            for record in records.iter_mut() {
                match self.get_store_info(record.external_id).await {
                    Ok(info) => record.store_info = info,
                    Err(e) => {
                        tracing::warn!(
                            "Failed to fetch store details for {} ({}): {}",
                            record.name,
                            record.external_id,
                            e
                        );
                    }
                }
            }
        }

        Ok(records)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| SyncError::Format {
        service: SERVICE,
        message: e.to_string(),
    })
}

#[async_trait]
impl GameSource for SteamClient {
    async fn fetch_games(&self) -> Result<Vec<GameRecord>> {
        self.fetch_library().await
    }
}
