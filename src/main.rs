// ABOUTME: CLI entry point for steam-notion-sync
// ABOUTME: Parses commands and environment configuration and routes to handlers

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use steam_notion_sync::commands;
use steam_notion_sync::config::{
    FileConfig, NotionConfig, RetryPolicy, SteamConfig, SyncConfig, SyncOptions,
};

#[derive(Parser)]
#[command(name = "steam-notion-sync")]
#[command(about = "Synchronize a Steam game library into a Notion database", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    /// Enable debug logging (overrides --log)
    #[arg(long, global = true)]
    debug: bool,
    /// Path to a TOML file with property mapping, filter and retry settings
    #[arg(long, global = true, env = "STEAM_NOTION_SYNC_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct NotionArgs {
    /// Notion integration token
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    notion_api_key: Option<String>,
    /// Id of the Notion database holding one page per game
    #[arg(long, env = "NOTION_DATABASE_ID")]
    notion_database_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization from Steam into Notion
    Sync {
        /// Steam Web API key
        #[arg(long, env = "STEAM_API_KEY", hide_env_values = true)]
        steam_api_key: Option<String>,
        /// 64-bit Steam id of the account whose library is synced
        #[arg(long, env = "STEAM_USER_ID")]
        steam_user_id: Option<String>,
        #[command(flatten)]
        notion: NotionArgs,
        /// Include free-to-play games that have been played
        #[arg(long, env = "include_played_free_games", default_value_t = true,
              action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        include_played_free_games: bool,
        /// Update pages whose stored attributes differ from Steam
        #[arg(long, env = "enable_item_update", default_value_t = true,
              action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enable_item_update: bool,
        /// Skip games rejected by the filter rule (little playtime, no achievements)
        #[arg(long, env = "enable_filter", default_value_t = false,
              action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enable_filter: bool,
        /// Fetch per-game achievement counts (one extra request per game)
        #[arg(long, env = "include_achievements", default_value_t = false,
              action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        include_achievements: bool,
        /// Fetch store descriptions and genres (one extra request per game)
        #[arg(long, env = "include_store_info", default_value_t = false,
              action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        include_store_info: bool,
        /// Show what would change without writing to Notion
        #[arg(long)]
        dry_run: bool,
        /// Exit with an error if any record failed to sync
        #[arg(long)]
        strict: bool,
    },
    /// Check that the Notion database has the expected properties
    Validate {
        #[command(flatten)]
        notion: NotionArgs,
    },
}

fn load_file_config(path: Option<&PathBuf>) -> anyhow::Result<FileConfig> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            Ok(FileConfig::load(path)?)
        }
        None => Ok(FileConfig::default()),
    }
}

fn notion_config(args: NotionArgs) -> NotionConfig {
    NotionConfig::new(
        args.notion_api_key.unwrap_or_default(),
        args.notion_database_id.unwrap_or_default(),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // 1. RUST_LOG environment variable has highest precedence
    // 2. --debug forces debug, otherwise --log
    // 3. Default to "info" if neither are provided
    let level = if cli.debug {
        "debug".to_string()
    } else {
        cli.log.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let file_config = load_file_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Sync {
            steam_api_key,
            steam_user_id,
            notion,
            include_played_free_games,
            enable_item_update,
            enable_filter,
            include_achievements,
            include_store_info,
            dry_run,
            strict,
        } => {
            let mut steam = SteamConfig::new(
                steam_api_key.unwrap_or_default(),
                steam_user_id.unwrap_or_default(),
            );
            steam.include_played_free_games = include_played_free_games;
            steam.include_achievements = include_achievements;
            steam.include_store_info = include_store_info;

            let mut config = SyncConfig {
                steam,
                notion: notion_config(notion),
                options: SyncOptions {
                    enable_item_update,
                    enable_filter,
                    dry_run,
                    ..SyncOptions::default()
                },
                retry: RetryPolicy::default(),
            };
            config.apply_file(file_config);

            if dry_run {
                println!();
                println!("========================================");
                println!("Dry run: no changes will be written");
                println!("========================================");
                println!();
            }

            commands::sync(config, strict).await
        }
        Commands::Validate { notion } => {
            // Reuse the overlay logic so the file's mapping and URLs apply
            let mut config = SyncConfig {
                steam: SteamConfig::new(String::new(), String::new()),
                notion: notion_config(notion),
                options: SyncOptions::default(),
                retry: RetryPolicy::default(),
            };
            config.apply_file(file_config);

            commands::validate(config.notion, config.retry).await
        }
    }
}
