//! Configuration management for the bulletin CLI

use std::path::Path;

use bulletin_core::{BridgeConfig, ColorPair};
use bulletin_overlay::{Bounds, OverlayConfig};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub peer: PeerConfig,
    pub surface: SurfaceConfig,
    pub bridge: BridgeConfig,
    pub overlay: OverlayConfig,
}

/// The local participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub name: String,
    /// Stroke and fill as `#rrggbb,#rrggbb`
    pub colors: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: "me".to_string(),
            colors: "#005fe4,#00a0ff".to_string(),
        }
    }
}

/// The scripted peer on the loopback channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub name: String,
    pub colors: String,
    /// Echo each sent message back from the peer
    pub echo: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            name: "peer".to_string(),
            colors: "#b20008,#ff2b34".to_string(),
            echo: true,
        }
    }
}

/// Display surface the bubbles are laid out on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: i32,
    pub height: i32,
    /// Milliseconds between redraw passes in chat mode
    pub redraw_interval_ms: u64,
    /// Fixed placement seed; entropy is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
            redraw_interval_ms: 500,
            seed: None,
        }
    }
}

impl SurfaceConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.identity.name.trim().is_empty() {
            return Err(CliError::Config("identity name must not be empty".to_string()));
        }
        if self.peer.name.trim().is_empty() {
            return Err(CliError::Config("peer name must not be empty".to_string()));
        }
        ColorPair::parse(&self.identity.colors).map_err(bulletin_core::BulletinError::from)?;
        ColorPair::parse(&self.peer.colors).map_err(bulletin_core::BulletinError::from)?;

        if self.surface.width <= 0 || self.surface.height <= 0 {
            return Err(CliError::Config("surface dimensions must be positive".to_string()));
        }
        if self.surface.redraw_interval_ms == 0 {
            return Err(CliError::Config("redraw_interval_ms must be at least 1".to_string()));
        }

        self.bridge.validate()?;
        self.overlay.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [identity]
            name = "alice"

            [surface]
            width = 800
            seed = 7

            [overlay]
            reserved_margin = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.identity.name, "alice");
        assert_eq!(config.identity.colors, IdentityConfig::default().colors);
        assert_eq!(config.surface.bounds(), Bounds::new(800, 900));
        assert_eq!(config.surface.seed, Some(7));
        assert_eq!(config.overlay.reserved_margin, 40);
        assert_eq!(config.bridge, BridgeConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_round_trips() {
        let config = AppConfig::default();
        let parsed: AppConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.identity.colors = "blue".to_string();
        assert!(matches!(config.validate(), Err(CliError::Bridge(_))));

        let mut config = AppConfig::default();
        config.surface.height = 0;
        assert!(matches!(config.validate(), Err(CliError::Config(_))));

        let mut config = AppConfig::default();
        config.overlay.reserved_margin = -1;
        assert!(matches!(config.validate(), Err(CliError::Overlay(_))));
    }
}
