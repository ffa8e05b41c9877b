//! Core duel logic - pure, deterministic, and testable
//!
//! Everything a single memory duel needs: board generation, the duel state
//! machine, scoring rules and configuration. Nothing here touches the network,
//! the filesystem or a clock; the scheduler drives duels one tick at a time.
//!
//! - **Deterministic**: the same seed and inputs produce the same duel
//! - **Headless**: presentation hooks in through [`DuelListener`]
//!
//! # Module Structure
//!
//! - [`board`]: n×n grid of paired symbols and the board generator
//! - [`config`]: per-duel timing and scoring constants
//! - [`deck`]: the validated symbol pool boards draw from
//! - [`duel`]: the `Memorizing → Playing → Finished` state machine
//! - [`events`]: duel events and the listener trait
//! - [`rng`]: seeded RNG for board shuffles
//! - [`scoring`]: point awards for pairs, streaks and outcomes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use memory_duel_core::{Deck, Duel, DuelConfig, DuelPlayer, SimpleRng};
//! use memory_duel_core::types::{BlockPos, DuelId, Parcel, ParcelId, Phase, PlayerId};
//!
//! let parcel = Parcel::from_corners("arena", BlockPos::new(0, 64, 0), BlockPos::new(9, 70, 9));
//! let deck = Deck::new(["APPLE", "BONE", "COAL"]).unwrap();
//! let config = Arc::new(DuelConfig { grid_size: 2, memorize_ticks: 1, ..DuelConfig::default() });
//!
//! let mut duel = Duel::new(
//!     DuelId(1),
//!     ParcelId(0),
//!     &parcel,
//!     [DuelPlayer::new(PlayerId(1)), DuelPlayer::new(PlayerId(2))],
//!     config,
//!     &deck,
//!     &mut SimpleRng::new(7),
//! )
//! .unwrap();
//!
//! duel.advance().unwrap();
//! assert_eq!(duel.phase(), Phase::Playing);
//! assert_eq!(duel.turn_holder(), Some(PlayerId(1)));
//! ```
//!
//! # Timing
//!
//! One tick is [`TICK_MS`](types::TICK_MS) milliseconds of wall time. All
//! durations in [`DuelConfig`] are expressed in ticks.

pub mod board;
pub mod config;
pub mod deck;
pub mod duel;
pub mod error;
pub mod events;
pub mod rng;
pub mod scoring;

pub use memory_duel_types as types;

pub use board::{generate_board, pairs_for, Board, Cell};
pub use config::{DuelConfig, ScoringConfig, ENV_PREFIX};
pub use deck::Deck;
pub use duel::{
    CellView, Duel, DuelPlayer, DuelSnapshot, PlayerSnapshot, SelectionOutcome, SelectionRejected,
};
pub use error::{BoardError, ConfigError, DeckError, DuelError};
pub use events::{DuelEvent, DuelListener, NoopListener, RecordingListener};
pub use rng::SimpleRng;
pub use scoring::{
    calculate_pair_score, comeback_award, pair_awards, settle_completion, settle_forfeit,
    settle_timeout, Award, AwardReason, PairScore, Settlement,
};
