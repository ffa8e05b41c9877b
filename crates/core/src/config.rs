//! Duel configuration
//!
//! Supplied as a flat key/value object when duels are created. Every key has
//! a default (see `memory_duel_types`), so partial configurations are fine.
//!
//! | key | default |
//! |-----|---------|
//! | `memorize_ticks` | 100 |
//! | `turn_time_ticks` | 1200 |
//! | `grid_size` | 4 |
//! | `mismatch_reveal_ticks` | 30 |
//! | `change_turn_on_fail` | true |
//! | `cleanup_delay_ticks` | 100 |
//! | `lobby_feedback_ticks` | 40 |
//! | `pair_points` | 2 |
//! | `first_pair_bonus` | 3 |
//! | `streak_bonus` | 1 |
//! | `victory_points` | 20 |
//! | `participation_points` | 5 |
//! | `timeout_tie_points` | 8 |
//! | `comeback_enabled` | false |
//! | `comeback_margin` | 50 |
//! | `comeback_bonus` | 10 |
//!
//! Environment variables use the upper-cased key with a `MEMORY_DUEL_` prefix,
//! e.g. `MEMORY_DUEL_GRID_SIZE=2`.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::types::*;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "MEMORY_DUEL_";

/// Point constants for the scoring rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub pair_points: i64,
    pub first_pair_bonus: i64,
    pub streak_bonus: i64,
    pub victory_points: i64,
    pub participation_points: i64,
    pub timeout_tie_points: i64,
    /// The comeback rule compares external tournament points, not pairs on
    /// this board. Off unless explicitly enabled.
    pub comeback_enabled: bool,
    pub comeback_margin: i64,
    pub comeback_bonus: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pair_points: DEFAULT_PAIR_POINTS,
            first_pair_bonus: DEFAULT_FIRST_PAIR_BONUS,
            streak_bonus: DEFAULT_STREAK_BONUS,
            victory_points: DEFAULT_VICTORY_POINTS,
            participation_points: DEFAULT_PARTICIPATION_POINTS,
            timeout_tie_points: DEFAULT_TIMEOUT_TIE_POINTS,
            comeback_enabled: false,
            comeback_margin: DEFAULT_COMEBACK_MARGIN,
            comeback_bonus: DEFAULT_COMEBACK_BONUS,
        }
    }
}

/// Everything a duel needs to know about timing and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    pub memorize_ticks: u32,
    pub turn_time_ticks: u32,
    pub grid_size: u8,
    pub mismatch_reveal_ticks: u32,
    pub change_turn_on_fail: bool,
    pub cleanup_delay_ticks: u32,
    pub lobby_feedback_ticks: u32,
    #[serde(flatten)]
    pub scoring: ScoringConfig,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            memorize_ticks: DEFAULT_MEMORIZE_TICKS,
            turn_time_ticks: DEFAULT_TURN_TIME_TICKS,
            grid_size: DEFAULT_GRID_SIZE,
            mismatch_reveal_ticks: DEFAULT_MISMATCH_REVEAL_TICKS,
            change_turn_on_fail: true,
            cleanup_delay_ticks: DEFAULT_CLEANUP_DELAY_TICKS,
            lobby_feedback_ticks: DEFAULT_LOBBY_FEEDBACK_TICKS,
            scoring: ScoringConfig::default(),
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl DuelConfig {
    /// Build from a flat key/value object. Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (key, value) in map {
            if !config.set(key, value)? {
                debug!(key = key.as_str(), "ignoring unknown duel config key");
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Build from `MEMORY_DUEL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let map: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_ascii_lowercase(), v))
            })
            .collect();
        Self::from_map(&map)
    }

    /// Apply one key. Returns `Ok(false)` if the key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, ConfigError> {
        match key {
            "memorize_ticks" => self.memorize_ticks = parse(key, value)?,
            "turn_time_ticks" => self.turn_time_ticks = parse(key, value)?,
            "grid_size" => self.grid_size = parse(key, value)?,
            "mismatch_reveal_ticks" => self.mismatch_reveal_ticks = parse(key, value)?,
            "change_turn_on_fail" => self.change_turn_on_fail = parse_bool(key, value)?,
            "cleanup_delay_ticks" => self.cleanup_delay_ticks = parse(key, value)?,
            "lobby_feedback_ticks" => self.lobby_feedback_ticks = parse(key, value)?,
            "pair_points" => self.scoring.pair_points = parse(key, value)?,
            "first_pair_bonus" => self.scoring.first_pair_bonus = parse(key, value)?,
            "streak_bonus" => self.scoring.streak_bonus = parse(key, value)?,
            "victory_points" => self.scoring.victory_points = parse(key, value)?,
            "participation_points" => self.scoring.participation_points = parse(key, value)?,
            "timeout_tie_points" => self.scoring.timeout_tie_points = parse(key, value)?,
            "comeback_enabled" => self.scoring.comeback_enabled = parse_bool(key, value)?,
            "comeback_margin" => self.scoring.comeback_margin = parse(key, value)?,
            "comeback_bonus" => self.scoring.comeback_bonus = parse(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < 2 || self.grid_size % 2 != 0 {
            return Err(ConfigError::Rejected(format!(
                "grid_size must be even and at least 2, got {}",
                self.grid_size
            )));
        }
        if self.turn_time_ticks == 0 {
            return Err(ConfigError::Rejected(
                "turn_time_ticks must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Pairs on a board of the configured size.
    pub fn pairs_required(&self) -> usize {
        crate::board::pairs_for(self.grid_size)
    }
}
