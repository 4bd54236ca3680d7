//! Engine configuration
//!
//! Both windows are configuration constants read from the settings table,
//! not hard-coded literals. Loaded once at startup and injected into the
//! scan pipeline by the composition root.

use chrono::Duration;
use sqlx::SqlitePool;
use wits_common::db::settings;
use wits_common::Result;

/// Timing windows for the ingestion engine
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Minimum elapsed time before a repeat scan of a key may flip its
    /// presence state (protects against lingering near a reader)
    pub toggle_cooldown: Duration,
    /// Minimum elapsed time before a repeat scan of a key is considered at
    /// all (protects against reader-level read storms)
    pub suppression_window: Duration,
}

impl EngineConfig {
    /// Build a config from raw millisecond values
    pub fn from_millis(toggle_cooldown_ms: i64, suppression_window_ms: i64) -> Self {
        Self {
            toggle_cooldown: Duration::milliseconds(toggle_cooldown_ms),
            suppression_window: Duration::milliseconds(suppression_window_ms),
        }
    }

    /// Load the windows from the settings table (writing defaults on first run)
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        let toggle_cooldown_ms = settings::get_toggle_cooldown_ms(db).await?;
        let suppression_window_ms = settings::get_suppression_window_ms(db).await?;
        Ok(Self::from_millis(toggle_cooldown_ms, suppression_window_ms))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_millis(30000, 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows() {
        let config = EngineConfig::default();
        assert_eq!(config.toggle_cooldown, Duration::seconds(30));
        assert_eq!(config.suppression_window, Duration::milliseconds(500));
    }

    #[test]
    fn test_from_millis() {
        let config = EngineConfig::from_millis(60000, 2000);
        assert_eq!(config.toggle_cooldown, Duration::seconds(60));
        assert_eq!(config.suppression_window, Duration::seconds(2));
    }
}
