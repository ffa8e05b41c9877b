//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! Everything here is plain data: identities, spatial regions and the timing /
//! scoring defaults consumed by the duel engine.
//!
//! # Timing
//!
//! All countdowns are measured in scheduler ticks:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 50 | Fixed scheduler interval (20 ticks per second) |
//! | `DEFAULT_MEMORIZE_TICKS` | 100 | Face-up memorization phase (5s) |
//! | `DEFAULT_TURN_TIME_TICKS` | 1200 | Per-player time budget (60s) |
//! | `DEFAULT_MISMATCH_REVEAL_TICKS` | 30 | Mismatched cells stay visible (1.5s) |
//! | `DEFAULT_CLEANUP_DELAY_TICKS` | 100 | Grace delay before a finished duel is torn down |
//! | `DEFAULT_LOBBY_FEEDBACK_TICKS` | 40 | Lobby waiting-count feedback period |
//!
//! # Examples
//!
//! ```
//! use memory_duel_types::{BlockPos, Parcel, Phase};
//!
//! // Any two opposite corners describe the same parcel.
//! let a = Parcel::from_corners("world", BlockPos::new(10, 64, 10), BlockPos::new(0, 60, 0));
//! let b = Parcel::from_corners("world", BlockPos::new(0, 60, 0), BlockPos::new(10, 64, 10));
//! assert_eq!(a, b);
//! assert_eq!(a.min, BlockPos::new(0, 60, 0));
//!
//! assert!(Phase::Finished.is_terminal());
//! assert!(!Phase::Playing.is_terminal());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed scheduler interval in milliseconds (50ms = 20 ticks per second)
pub const TICK_MS: u64 = 50;

/// Game name used for ledger submissions.
pub const GAME_NAME: &str = "memory";

/// Smallest palette a deck may be built from.
///
/// Whether a deck is large enough for a given board is checked separately
/// when each duel is created.
pub const MIN_DECK_SIZE: usize = 1;

/// Memorization phase duration (5s)
pub const DEFAULT_MEMORIZE_TICKS: u32 = 100;

/// Per-player time budget (60s)
pub const DEFAULT_TURN_TIME_TICKS: u32 = 1200;

/// Default board dimension (4x4 = 8 pairs)
pub const DEFAULT_GRID_SIZE: u8 = 4;

/// How long a mismatched pair stays face-up (1.5s)
pub const DEFAULT_MISMATCH_REVEAL_TICKS: u32 = 30;

/// Grace delay between a duel finishing and its teardown (5s)
pub const DEFAULT_CLEANUP_DELAY_TICKS: u32 = 100;

/// Lobby waiting-count feedback period (2s)
pub const DEFAULT_LOBBY_FEEDBACK_TICKS: u32 = 40;

/// Flat award for every pair found
pub const DEFAULT_PAIR_POINTS: i64 = 2;

/// One-time bonus for the first pair of a duel
pub const DEFAULT_FIRST_PAIR_BONUS: i64 = 3;

/// Bonus per pair from the second consecutive pair of a streak onward
pub const DEFAULT_STREAK_BONUS: i64 = 1;

/// Award for winning a duel
pub const DEFAULT_VICTORY_POINTS: i64 = 20;

/// Award for losing (or tying a completed board)
pub const DEFAULT_PARTICIPATION_POINTS: i64 = 5;

/// Award for each player when time runs out with equal pair counts
pub const DEFAULT_TIMEOUT_TIE_POINTS: i64 = 8;

/// Tournament-point deficit that qualifies a winner for the comeback bonus
pub const DEFAULT_COMEBACK_MARGIN: i64 = 50;

/// Comeback bonus
pub const DEFAULT_COMEBACK_BONUS: i64 = 10;

/// Identity of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Identity of a duel. Assigned monotonically, so ordering is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuelId(pub u64);

impl fmt::Display for DuelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duel#{}", self.0)
    }
}

/// Index of a parcel within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(pub usize);

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parcel#{}", self.0)
    }
}

/// Integer world coordinate. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned rectangular region bound to at most one duel at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parcel {
    pub world: String,
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Parcel {
    /// Build a parcel from any two opposite corners.
    pub fn from_corners(world: impl Into<String>, a: BlockPos, b: BlockPos) -> Self {
        Self {
            world: world.into(),
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Horizontal center along x (rounded toward negative infinity)
    pub fn center_x(&self) -> i32 {
        midpoint(self.min.x, self.max.x)
    }

    /// Horizontal center along z (rounded toward negative infinity)
    pub fn center_z(&self) -> i32 {
        midpoint(self.min.z, self.max.z)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }
}

// Widened so parcels spanning the whole i32 range don't overflow.
fn midpoint(min: i32, max: i32) -> i32 {
    let mid = (i64::from(min) + i64::from(max)).div_euclid(2);
    // min <= mid <= max
    mid as i32
}

/// A point players are sent to while waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawn {
    pub world: String,
    pub pos: BlockPos,
}

/// Named collection of parcels plus an optional waiting area.
///
/// Owned and persisted by an outside collaborator; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    pub name: String,
    pub parcels: Vec<Parcel>,
    #[serde(default)]
    pub lobby_spawn: Option<Spawn>,
}

impl Arena {
    pub fn new(name: impl Into<String>, parcels: Vec<Parcel>) -> Self {
        Self {
            name: name.into(),
            parcels,
            lobby_spawn: None,
        }
    }
}

/// One entry of the symbol palette (upper-case identifier, e.g. `RED_WOOL`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize and validate a raw palette entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use memory_duel_types::Symbol;
    ///
    /// assert_eq!(Symbol::parse(" red_wool ").unwrap().as_str(), "RED_WOOL");
    /// assert!(Symbol::parse("").is_none());
    /// assert!(Symbol::parse("not a block").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim().to_ascii_uppercase();
        if name.is_empty() {
            return None;
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        Some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Duel phases. `Finished` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Memorizing,
    Playing,
    Finished,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Memorizing => "memorizing",
            Phase::Playing => "playing",
            Phase::Finished => "finished",
        }
    }
}

/// How a duel reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every pair on the board was matched
    Completed,
    /// The turn holder's clock ran out
    Timeout,
    /// A player left mid-duel
    Forfeit,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::Timeout => "timeout",
            FinishReason::Forfeit => "forfeit",
        }
    }
}
