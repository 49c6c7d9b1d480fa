//! Application-level configuration loading, including the seed song catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use thiserror::Error;
use tracing::{info, warn};

use crate::{dao::models::SongEntity, state::lifecycle::DEFAULT_START_COUNTDOWN};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BEAT_ARENA_CONFIG_PATH";
const DEFAULT_MAX_PLAYERS: usize = 2;
const MAX_PLAYERS_LIMIT: usize = 8;
const DEFAULT_RELAY_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    start_countdown: Duration,
    default_max_players: usize,
    max_players_limit: usize,
    relay_capacity: usize,
    songs: Vec<SongEntity>,
}

/// Reasons a parsed configuration file is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Default capacity outside `2..=limit`.
    #[error("default_max_players ({default}) must be between 2 and max_players_limit ({limit})")]
    PlayerBounds {
        /// Configured default capacity.
        default: usize,
        /// Configured upper bound.
        limit: usize,
    },
    /// Relay buffer of zero.
    #[error("relay_capacity must be greater than zero")]
    EmptyRelay,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        songs = app_config.songs.len(),
                        countdown_ms = app_config.start_countdown.as_millis() as u64,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and check a JSON configuration document. Missing keys take their defaults.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        Ok(Self::try_from(raw)?)
    }

    /// Delay between the host's start and the synchronized game begin.
    pub fn start_countdown(&self) -> Duration {
        self.start_countdown
    }

    /// Capacity applied when a creation request does not specify one.
    pub fn default_max_players(&self) -> usize {
        self.default_max_players
    }

    /// Largest capacity a creation request may ask for.
    pub fn max_players_limit(&self) -> usize {
        self.max_players_limit
    }

    /// Buffer size of the in-process relay.
    pub fn relay_capacity(&self) -> usize {
        self.relay_capacity
    }

    /// Seed records of the in-memory song catalog.
    pub fn songs(&self) -> &[SongEntity] {
        &self.songs
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            start_countdown: DEFAULT_START_COUNTDOWN,
            default_max_players: DEFAULT_MAX_PLAYERS,
            max_players_limit: MAX_PLAYERS_LIMIT,
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            songs: default_songs(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    start_countdown_ms: Duration,
    default_max_players: usize,
    max_players_limit: usize,
    relay_capacity: usize,
    songs: Vec<SongEntity>,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = AppConfig::default();
        Self {
            start_countdown_ms: defaults.start_countdown,
            default_max_players: defaults.default_max_players,
            max_players_limit: defaults.max_players_limit,
            relay_capacity: defaults.relay_capacity,
            songs: defaults.songs,
        }
    }
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        if value.default_max_players < 2 || value.default_max_players > value.max_players_limit {
            return Err(ConfigError::PlayerBounds {
                default: value.default_max_players,
                limit: value.max_players_limit,
            });
        }
        if value.relay_capacity == 0 {
            return Err(ConfigError::EmptyRelay);
        }

        Ok(Self {
            start_countdown: value.start_countdown_ms,
            default_max_players: value.default_max_players,
            max_players_limit: value.max_players_limit,
            relay_capacity: value.relay_capacity,
            songs: value.songs,
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in song list shipped with the binary.
fn default_songs() -> Vec<SongEntity> {
    [
        (1, "Neon Skyline", "hard", 184),
        (2, "Midnight Pulse", "normal", 152),
        (3, "Glass Horizon", "easy", 131),
        (4, "Overdrive Heart", "expert", 207),
    ]
    .into_iter()
    .map(|(id, title, difficulty, length_seconds)| SongEntity {
        id,
        title: title.to_string(),
        difficulty: difficulty.to_string(),
        length_seconds,
        cover: format!("covers/{id}.png"),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();

        assert_eq!(config.start_countdown(), Duration::from_millis(3_000));
        assert_eq!(config.default_max_players(), 2);
        assert_eq!(config.max_players_limit(), 8);
        assert_eq!(config.relay_capacity(), 256);
        assert_eq!(config.songs().len(), default_songs().len());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "start_countdown_ms": 5000,
                "default_max_players": 4,
                "songs": [{"id": 9, "title": "Solo", "difficulty": "easy", "length_seconds": 60, "cover": "c.png"}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.start_countdown(), Duration::from_secs(5));
        assert_eq!(config.default_max_players(), 4);
        assert_eq!(config.songs().len(), 1);
        assert_eq!(config.songs()[0].id, 9);
    }

    #[test]
    fn inconsistent_bounds_are_rejected() {
        let raw = RawConfig {
            default_max_players: 10,
            ..RawConfig::default()
        };
        assert_eq!(
            AppConfig::try_from(raw).unwrap_err(),
            ConfigError::PlayerBounds {
                default: 10,
                limit: 8
            }
        );

        let raw = RawConfig {
            relay_capacity: 0,
            ..RawConfig::default()
        };
        assert_eq!(AppConfig::try_from(raw).unwrap_err(), ConfigError::EmptyRelay);
        assert!(AppConfig::from_json("not json").is_err());
    }
}
