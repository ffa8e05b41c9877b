//! Session-level hooks on top of [`DuelListener`].

use memory_duel_core::{DuelListener, DuelSnapshot, NoopListener, RecordingListener};

use crate::types::{DuelId, ParcelId, PlayerId};

/// Everything the engine reports to presentation collaborators.
///
/// Duel events arrive through the [`DuelListener`] supertrait; the extra hooks
/// here cover things that happen outside a single duel's state machine.
pub trait SessionListener: DuelListener {
    /// Player-facing feedback, e.g. a rejected selection or lobby join.
    fn on_feedback(&mut self, _player: PlayerId, _message: &str) {}

    /// Periodic lobby status: how many players are waiting.
    fn on_lobby_status(&mut self, _player: PlayerId, _waiting: usize) {}

    /// Per-tick state of a live duel, for scoreboards.
    fn on_duel_state(&mut self, _snapshot: &DuelSnapshot) {}

    /// The duel was torn down and its parcel released.
    fn on_duel_removed(&mut self, _duel: DuelId, _parcel: ParcelId) {}
}

impl SessionListener for NoopListener {}

impl SessionListener for RecordingListener {}
