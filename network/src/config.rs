// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session and lobby configuration

use crate::room_code::RoomCode;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use quarto_core::VictoryOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Store path under which room records live
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Random codes tried before falling back to a timestamp code
    #[serde(default = "default_room_code_attempts")]
    pub room_code_attempts: u32,
    /// Rooms older than this are pruned
    #[serde(default = "default_room_ttl_secs")]
    pub room_ttl_secs: u64,
    /// Capacity of notification and event channels
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
    /// Win topologies for newly hosted games
    #[serde(default)]
    pub default_victory: VictoryOptions,
}

fn default_key_prefix() -> String {
    "rooms".to_string()
}

fn default_room_code_attempts() -> u32 {
    10
}

fn default_room_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_notification_buffer() -> usize {
    64
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            room_code_attempts: default_room_code_attempts(),
            room_ttl_secs: default_room_ttl_secs(),
            notification_buffer: default_notification_buffer(),
            default_victory: VictoryOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Store key of a room record
    pub fn room_key(&self, code: &RoomCode) -> String {
        format!("{}/{}", self.key_prefix, code)
    }

    /// Prefix shared by every room key
    pub fn rooms_prefix(&self) -> String {
        format!("{}/", self.key_prefix)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "quarto", "quarto").context("Failed to determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load the config from the platform config directory, writing the defaults
/// there first when the file does not exist yet.
pub fn load_config() -> Result<SessionConfig> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        tracing::info!("Config file not found, creating default at: {}", config_path.display());
        let config = SessionConfig::default();
        save_config_to(&config, &config_path)?;
        return Ok(config);
    }
    load_config_from(&config_path)
}

pub fn load_config_from(path: &Path) -> Result<SessionConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str::<SessionConfig>(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn save_config_to(config: &SessionConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let toml_content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, toml_content).with_context(|| format!("Failed to write config file: {}", path.display()))?;
    tracing::info!("Saved config to: {}", path.display());
    Ok(())
}
