//! Adapter module - async bridge between the platform and the duel engine
//!
//! The engine is synchronous and single-writer. This crate gives it a home on
//! tokio: one task owns the [`MemoryGame`](memory_duel_engine::MemoryGame),
//! drives its ticks on a fixed interval and applies inbound events between
//! ticks. Presentation collaborators subscribe to a broadcast stream of
//! outbound messages.
//!
//! # Flow
//!
//! 1. **Inbound**: `select_cell`, `join_lobby`, `leave`, `start_round` on the
//!    [`AdapterHandle`] queue commands for the game task
//! 2. **Tick**: while a duel or the lobby is active, the task ticks every
//!    `tick_ms`, draining the queue first; while idle it just waits
//! 3. **Outbound**: snapshots, cues, feedback and score submissions go out on
//!    the broadcast channel (see [`protocol`])
//! 4. **Ledger**: if configured, score submissions are appended to a
//!    JSON-lines file by a separate task (see [`ledger`])
//!
//! # Environment Variables
//!
//! - `MEMORY_DUEL_TICK_MS`: tick interval (default: 50)
//! - `MEMORY_DUEL_MAX_PENDING`: inbound queue bound (default: 256)
//! - `MEMORY_DUEL_LEDGER_PATH`: ledger file; unset disables the ledger
//!
//! # Example Messages
//!
//! ```text
//! {"type":"cue","duel":1,"cue":{"kind":"phase_changed","phase":"playing"}}
//! {"type":"feedback","player":2,"message":"it is not your turn"}
//! {"type":"score","player":1,"game":"memory","delta":20,"reason":"victory"}
//! {"type":"duel_removed","duel":1,"parcel":0}
//! ```

pub mod ledger;
pub mod protocol;
pub mod runtime;

pub use memory_duel_core as core;
pub use memory_duel_engine as engine;
pub use memory_duel_types as types;

pub use ledger::{read_ledger, spawn_ledger};
pub use protocol::{ChannelListener, Cue, OutboundMessage, ScoreSubmission};
pub use runtime::{spawn, AdapterHandle, RuntimeConfig};
