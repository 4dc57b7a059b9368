// ABOUTME: Steam Web API source for game records
// ABOUTME: Exports the HTTP client and response models

pub mod client;
pub mod models;

pub use client::SteamClient;
pub use models::{OwnedGame, OwnedGamesEnvelope, PlayerAchievementsEnvelope};
