//! Resource engine binary for Astral Kingdoms.
//!
//! This is the main entry point that wires together the economy core and
//! the persistence layer. It loads configuration, connects to the store
//! and the messaging fabric, loads every configured kingdom, and runs
//! until a shutdown signal arrives.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `astral-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to Dragonfly (durable kingdom records)
//! 4. Connect to NATS (remote-change feed)
//! 5. Load the bonus tables (festival, alliances, world event)
//! 6. Hydrate or seed each configured kingdom and spawn its actor
//! 7. Run until a shutdown signal
//! 8. Unload every kingdom (final flushes)

mod error;
mod seed;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use astral_economy::config::AstralConfig;
use astral_sync::actor::ActorOptions;
use astral_sync::{AnnouncingStore, DragonflyStore, KingdomStore, RemoteFeed};
use astral_types::KingdomId;

use crate::error::EngineError;
use crate::seed::BonusSeedConfig;

/// Application entry point for the resource engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("astral-engine starting");
    info!(
        tick_period_secs = config.economy.tick_period_secs,
        flush_timeout_ms = config.sync.flush_timeout_ms,
        kingdom_count = config.kingdoms.len(),
        "Configuration loaded"
    );

    // 3. Connect to Dragonfly.
    let dragonfly = DragonflyStore::connect(&config.infrastructure.dragonfly_url).await?;

    // 4. Connect to NATS; writes are announced on the feed so peer
    //    processes converge.
    let feed = RemoteFeed::connect(&config.infrastructure.nats_url).await?;
    let store = AnnouncingStore::new(dragonfly, feed.clone());

    // 5. Load the bonus tables.
    let tables = Arc::new(load_bonus_seed()?.into_tables());
    info!(
        world_event = tables.world_event.name,
        world_event_active = tables.world_event.active,
        "Bonus tables loaded"
    );

    // 6. Load every configured kingdom.
    let tick_period = Duration::from_secs(config.economy.tick_period_secs);
    let flush_timeout = Duration::from_millis(config.sync.flush_timeout_ms);

    let mut handles = Vec::new();
    for kingdom_config in &config.kingdoms {
        let kingdom = KingdomId::from(kingdom_config.kingdom_id);
        let now = Utc::now();

        let ledger = match store.get(kingdom).await? {
            Some(record) => {
                info!(kingdom_id = %kingdom, "Hydrating kingdom from stored record");
                astral_sync::hydrate(&record, kingdom, kingdom_config.zodiac_sign, now)
            }
            None => {
                info!(kingdom_id = %kingdom, "No stored record; seeding fresh kingdom");
                seed::seed_ledger(kingdom_config, &config.economy.starting_stats, now)
            }
        };

        let handle = astral_sync::spawn(
            ledger,
            Arc::clone(&tables),
            store.clone(),
            ActorOptions {
                tick_period,
                flush_timeout,
                ally_sign: kingdom_config.ally_sign,
            },
        );
        tokio::spawn(feed.clone().run(kingdom, handle.sender()));
        handles.push(handle);
    }
    info!(kingdom_count = handles.len(), "Kingdoms loaded, engine running");

    // 7. Run until shutdown.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received; unloading kingdoms");

    // 8. Unload every kingdom; each performs a final flush of unsaved
    //    state before its actor stops.
    for handle in handles {
        handle.unload().await;
    }

    info!("astral-engine shutdown complete");
    Ok(())
}

/// Load the main configuration from `astral-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<AstralConfig, EngineError> {
    let config_path = Path::new("astral-config.yaml");
    if config_path.exists() {
        let config = AstralConfig::from_file(config_path)?;
        Ok(config)
    } else {
        Ok(AstralConfig::default())
    }
}

/// Load the bonus tables from the `bonuses` section of `astral-config.yaml`.
///
/// If the file does not exist or lacks the `bonuses` key, the tables start
/// inert (no festival, no alliances, no world event).
fn load_bonus_seed() -> Result<BonusSeedConfig, EngineError> {
    let config_path = Path::new("astral-config.yaml");
    if !config_path.exists() {
        return Ok(BonusSeedConfig::default());
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::BonusSeed {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "bonuses" section.
    let raw: serde_yml::Value =
        serde_yml::from_str(&contents).map_err(|e| EngineError::BonusSeed {
            message: format!("failed to parse config YAML: {e}"),
        })?;

    raw.get("bonuses").map_or_else(
        || Ok(BonusSeedConfig::default()),
        |bonuses| {
            serde_yml::from_value(bonuses.clone()).map_err(|e| EngineError::BonusSeed {
                message: format!("failed to parse bonuses config: {e}"),
            })
        },
    )
}
