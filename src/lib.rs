//! Memory duel (workspace facade crate).
//!
//! Re-exports the member crates under short names so binaries, tests and
//! benches can use `memory_duel::{adapter, core, engine, types}`.

pub use memory_duel_adapter as adapter;
pub use memory_duel_core as core;
pub use memory_duel_engine as engine;
pub use memory_duel_types as types;
