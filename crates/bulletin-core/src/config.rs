//! Bridge Configuration
//!
//! Tunables for delivery buffering, duplicate suppression and the status
//! notifications surfaced by the presence bridge.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{BulletinError, Result};
use crate::types::ColorPair;

/// Display name given to senders that cannot be resolved
pub const UNKNOWN_DISPLAY_NAME: &str = "???";

/// Configuration for the channel bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long status notifications stay on screen
    pub notification_timeout_secs: u64,
    /// Display name for unresolvable senders
    pub unknown_display_name: String,
    /// Colours used when a buddy record has none or a malformed pair
    pub fallback_colors: String,
    /// Messages held while no consumer is attached
    pub undelivered_buffer_capacity: usize,
    /// Recently acknowledged ids remembered to suppress double delivery
    pub acknowledged_window: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            notification_timeout_secs: 5,
            unknown_display_name: UNKNOWN_DISPLAY_NAME.to_string(),
            fallback_colors: ColorPair::default().encode(),
            undelivered_buffer_capacity: 256,
            acknowledged_window: 512,
        }
    }
}

impl BridgeConfig {
    /// Small buffers so eviction paths are easy to reach in tests
    pub fn testing() -> Self {
        Self {
            notification_timeout_secs: 1,
            undelivered_buffer_capacity: 4,
            acknowledged_window: 8,
            ..Self::default()
        }
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }

    /// Parsed fallback colours; a malformed setting degrades to the default pair
    pub fn fallback_colors(&self) -> ColorPair {
        ColorPair::parse_or(Some(self.fallback_colors.as_str()), ColorPair::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.unknown_display_name.trim().is_empty() {
            return Err(BulletinError::config_error(
                "unknown_display_name must not be empty",
            ));
        }
        if self.acknowledged_window == 0 {
            return Err(BulletinError::config_error(
                "acknowledged_window must be at least 1",
            ));
        }
        ColorPair::parse(&self.fallback_colors)?;
        Ok(())
    }
}
