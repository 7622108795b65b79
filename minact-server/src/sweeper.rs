//! Background SLA sweeper
//!
//! Periodically flags submitted tasks whose verification deadline has
//! passed, and clears out expired sessions while it is at it. The sweep
//! itself is idempotent, so the interval only affects detection latency.

use sqlx::SqlitePool;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::db::settings::get_setting;
use crate::db::sessions;
use crate::lifecycle;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Enable the periodic sweep (default: true)
    pub enabled: bool,
    /// Sweep interval in seconds (default: 300)
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

impl SweeperConfig {
    /// Load sweeper configuration from database settings, falling back to
    /// defaults for anything missing
    pub async fn from_database(pool: &SqlitePool) -> Self {
        let mut config = Self::default();

        if let Ok(Some(enabled)) = get_setting::<String>(pool, "sla_sweep_enabled").await {
            config.enabled = enabled.to_lowercase() == "true";
        }
        if let Ok(Some(secs)) = get_setting::<u64>(pool, "sla_sweep_interval_secs").await {
            if secs > 0 {
                config.interval_secs = secs;
            }
        }

        config
    }
}

/// Spawn the sweeper loop. Returns immediately; the loop runs until the
/// process exits.
pub fn spawn(pool: SqlitePool, config: SweeperConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            info!("SLA sweeper disabled via settings");
            return;
        }

        info!(interval_secs = config.interval_secs, "SLA sweeper started");
        let mut ticker = interval(Duration::from_secs(config.interval_secs));
        // First tick fires immediately; that sweep catches anything that
        // breached while the service was down
        loop {
            ticker.tick().await;

            match lifecycle::sla_sweep(&pool).await {
                Ok(0) => debug!("SLA sweep: nothing to flag"),
                Ok(flagged) => info!(flagged, "SLA sweep flagged overdue submissions"),
                Err(e) => error!("SLA sweep failed: {}", e),
            }

            match sessions::purge_expired(&pool).await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged expired sessions"),
                Err(e) => error!("Session purge failed: {}", e),
            }
        }
    })
}
