//! Session engine - scheduling, pairing and parcel bookkeeping for duels
//!
//! Synchronous and single-writer: whoever owns a [`MemoryGame`] (normally the
//! adapter's tick task) is the only code that mutates sessions. Inbound events
//! are applied between ticks, so no locking is needed.
//!
//! # Module Structure
//!
//! - [`allocator`]: parcels bound to at most one duel each
//! - [`registry`]: duels by id and by player
//! - [`scheduler`]: the tick driver, with per-duel failure isolation
//! - [`lobby`]: waiting list and all-or-nothing round start
//! - [`module`]: the module facade routing inbound events
//! - [`listener`]: session-level presentation hooks
//!
//! # Example
//!
//! ```
//! use memory_duel_core::{Deck, DuelConfig, DuelPlayer, NoopListener};
//! use memory_duel_engine::MemoryGame;
//! use memory_duel_engine::types::{Arena, BlockPos, Parcel, PlayerId};
//!
//! let arena = Arena::new(
//!     "arena",
//!     vec![Parcel::from_corners("w", BlockPos::new(0, 64, 0), BlockPos::new(9, 70, 9))],
//! );
//! let config = DuelConfig { grid_size: 2, ..DuelConfig::default() };
//! let mut game = MemoryGame::new(config, Deck::new(["A", "B"]).unwrap(), &arena, 1).unwrap();
//!
//! let mut listener = NoopListener;
//! game.join_lobby(DuelPlayer::new(PlayerId(1)), &mut listener).unwrap();
//! game.join_lobby(DuelPlayer::new(PlayerId(2)), &mut listener).unwrap();
//! let duels = game.start_round().unwrap();
//! assert_eq!(duels.len(), 1);
//!
//! game.tick(&mut listener);
//! assert_eq!(game.scheduler().active_count(), 1);
//! ```

pub mod allocator;
pub mod error;
pub mod listener;
pub mod lobby;
pub mod module;
pub mod registry;
pub mod scheduler;

pub use memory_duel_core as core;
pub use memory_duel_types as types;

pub use allocator::ResourceAllocator;
pub use error::{AllocError, LobbyError, RegistryError, SchedulerError};
pub use listener::SessionListener;
pub use lobby::LobbyPairingService;
pub use module::{InboundEvent, MemoryGame};
pub use registry::{DuelEntry, SessionRegistry};
pub use scheduler::SessionScheduler;
