//! Bot configuration.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::ConfigError;
use crate::messaging::ChannelId;
use crate::types::Difficulty;

pub const CHANNEL_IDS_VAR: &str = "CHANNEL_IDS";
pub const DIFFICULTY_VAR: &str = "REVERSI_DIFFICULTY";
pub const LABEL_VAR: &str = "REVERSI_LABEL";

/// Settings for the Reversi game surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Channels where games may be started. Empty allows every channel.
    #[serde(default)]
    pub allowed_channels: BTreeSet<ChannelId>,

    /// AI strength used when the command does not pick one.
    #[serde(default)]
    pub default_difficulty: Difficulty,

    /// Title shown at the top of every board message.
    #[serde(default = "default_label")]
    pub game_label: String,
}

fn default_label() -> String {
    "Reversi".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            allowed_channels: BTreeSet::new(),
            default_difficulty: Difficulty::default(),
            game_label: default_label(),
        }
    }
}

impl BotConfig {
    /// Reads the process environment (after loading `.env` if present).
    #[instrument]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(CHANNEL_IDS_VAR) {
            config.allowed_channels = parse_channel_list(&raw);
        }
        if let Some(raw) = lookup(DIFFICULTY_VAR).filter(|v| !v.trim().is_empty()) {
            config.default_difficulty = raw
                .parse()
                .map_err(|e: String| ConfigError::new(format!("{DIFFICULTY_VAR}: {e}")))?;
        }
        if let Some(label) = lookup(LABEL_VAR).filter(|v| !v.trim().is_empty()) {
            config.game_label = label.trim().to_string();
        }

        debug!(?config, "config resolved from environment");
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(channels = config.allowed_channels.len(), "Config loaded successfully");
        Ok(config)
    }

    pub fn allows_channel(&self, channel_id: &str) -> bool {
        self.allowed_channels.is_empty() || self.allowed_channels.contains(channel_id)
    }
}

/// Comma-separated ids; whitespace and blank entries are ignored.
fn parse_channel_list(raw: &str) -> BTreeSet<ChannelId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
