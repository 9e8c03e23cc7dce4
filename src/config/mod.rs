//! Client Configuration
//!
//! One `ClientConfig` groups the tunables of every subsystem. Defaults match
//! the shipped client. Files are read as JSON or RON depending on the
//! extension; missing sections and fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::actions::SenderConfig;
use crate::chat::ChatConfig;
use crate::damage_numbers::DamageNumberConfig;
use crate::death_screen::DeathScreenConfig;
use crate::dialog::DialogConfig;
use crate::logging::TracingConfig;
use crate::loot::LootConfig;
use crate::trade::TradeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid RON config: {0}")]
    RonDecode(#[from] ron::error::SpannedError),
    #[error("failed to encode RON config: {0}")]
    RonEncode(#[from] ron::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Ron,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Directory holding `TowerSave_{n}.json`
    pub directory: PathBuf,
    /// Seconds between auto-saves, `None` disables auto-save
    pub auto_save_interval: Option<f64>,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("saves"),
            auto_save_interval: Some(60.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub sender: SenderConfig,
    pub save: SaveConfig,
    pub chat: ChatConfig,
    pub trade: TradeConfig,
    pub dialog: DialogConfig,
    pub damage_numbers: DamageNumberConfig,
    pub loot: LootConfig,
    pub death_screen: DeathScreenConfig,
    pub tracing: TracingConfig,
}

fn finite_at_least(value: f32, min: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(min)
    } else {
        fallback
    }
}

impl ClientConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load from a `.json` or `.ron` file and clamp every value into range
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config = match format {
            ConfigFormat::Json => Self::from_json_str(&text)?,
            ConfigFormat::Ron => Self::from_ron_str(&text)?,
        };
        info!("Loaded client config from {}", path.display());
        Ok(config.validate())
    }

    /// Like `load`, but a missing or broken file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default client config ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?,
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Copy with out-of-range values clamped
    pub fn validate(&self) -> Self {
        let mut config = self.clone();
        config.sender = self.sender.clamped();

        config.save.auto_save_interval = self
            .save
            .auto_save_interval
            .filter(|secs| secs.is_finite() && *secs > 0.0);

        config.chat.max_messages = self.chat.max_messages.max(1);
        config.chat.fade_delay = finite_at_least(self.chat.fade_delay, 0.0, 5.0);
        config.chat.fade_opacity = if self.chat.fade_opacity.is_finite() {
            self.chat.fade_opacity.clamp(0.0, 1.0)
        } else {
            0.3
        };

        config.trade.max_trade_items = self.trade.max_trade_items.max(1);
        config.dialog.typewriter_speed = finite_at_least(self.dialog.typewriter_speed, 1.0, 40.0);

        config.damage_numbers.float_duration =
            finite_at_least(self.damage_numbers.float_duration, 0.1, 1.2);
        config.damage_numbers.float_height =
            finite_at_least(self.damage_numbers.float_height, 0.0, 120.0);
        config.damage_numbers.crit_scale =
            finite_at_least(self.damage_numbers.crit_scale, 1.0, 1.5);

        config.loot.despawn_time = finite_at_least(self.loot.despawn_time, 1.0, 60.0);
        config.loot.magnet_radius = finite_at_least(self.loot.magnet_radius, 0.0, 200.0);
        config.loot.magnet_speed = finite_at_least(self.loot.magnet_speed, 0.0, 500.0);
        config.loot.collection_radius = finite_at_least(self.loot.collection_radius, 0.0, 50.0);

        config.death_screen.respawn_cooldown =
            finite_at_least(self.death_screen.respawn_cooldown, 0.0, 3.0);
        config
    }
}
