//! Duel events and the listener interface presentation code hooks into.
//!
//! The duel never renders, plays sounds or talks to the ledger itself. It
//! records what happened as [`DuelEvent`]s; whoever drives the duel drains
//! them and hands each one to a [`DuelListener`].

use serde::{Deserialize, Serialize};

use crate::scoring::Award;
use crate::types::{BlockPos, DuelId, FinishReason, Phase, PlayerId, Symbol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuelEvent {
    PhaseChanged {
        phase: Phase,
    },
    CellRevealed {
        player: PlayerId,
        pos: BlockPos,
        symbol: Symbol,
    },
    CellsHidden {
        positions: Vec<BlockPos>,
    },
    PairFound {
        player: PlayerId,
        symbol: Symbol,
        pairs: u32,
        streak: u32,
    },
    Mismatch {
        player: PlayerId,
    },
    TurnChanged {
        player: PlayerId,
    },
    Award(Award),
    Finished {
        winner: Option<PlayerId>,
        reason: FinishReason,
    },
    BoardCleared,
}

impl DuelEvent {
    /// Route this event to the matching listener hook.
    pub fn dispatch<L: DuelListener + ?Sized>(&self, duel: DuelId, listener: &mut L) {
        listener.on_event(duel, self);
        match self {
            DuelEvent::PhaseChanged { phase } => listener.on_phase_changed(duel, *phase),
            DuelEvent::PairFound { player, symbol, .. } => {
                listener.on_pair_found(duel, *player, symbol)
            }
            DuelEvent::Award(award) => listener.on_award(duel, award),
            DuelEvent::Finished { winner, reason } => {
                listener.on_duel_finished(duel, *winner, *reason)
            }
            _ => {}
        }
    }
}

/// Receives duel events. Every hook defaults to a no-op.
pub trait DuelListener {
    /// Called for every event, before the specific hook.
    fn on_event(&mut self, _duel: DuelId, _event: &DuelEvent) {}

    fn on_phase_changed(&mut self, _duel: DuelId, _phase: Phase) {}

    fn on_pair_found(&mut self, _duel: DuelId, _player: PlayerId, _symbol: &Symbol) {}

    fn on_award(&mut self, _duel: DuelId, _award: &Award) {}

    fn on_duel_finished(&mut self, _duel: DuelId, _winner: Option<PlayerId>, _reason: FinishReason) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl DuelListener for NoopListener {}

/// Listener that records every event, handy for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    pub events: Vec<(DuelId, DuelEvent)>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn awards(&self) -> impl Iterator<Item = &Award> {
        self.events.iter().filter_map(|(_, e)| match e {
            DuelEvent::Award(a) => Some(a),
            _ => None,
        })
    }

    /// Net points recorded for one player.
    pub fn points_for(&self, player: PlayerId) -> i64 {
        self.awards()
            .filter(|a| a.player == player)
            .map(|a| a.points)
            .sum()
    }
}

impl DuelListener for RecordingListener {
    fn on_event(&mut self, duel: DuelId, event: &DuelEvent) {
        self.events.push((duel, event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::AwardReason;

    #[derive(Default)]
    struct Counting {
        all: usize,
        phases: usize,
        pairs: usize,
        awards: usize,
        finished: usize,
    }

    impl DuelListener for Counting {
        fn on_event(&mut self, _duel: DuelId, _event: &DuelEvent) {
            self.all += 1;
        }
        fn on_phase_changed(&mut self, _duel: DuelId, _phase: Phase) {
            self.phases += 1;
        }
        fn on_pair_found(&mut self, _duel: DuelId, _player: PlayerId, _symbol: &Symbol) {
            self.pairs += 1;
        }
        fn on_award(&mut self, _duel: DuelId, _award: &Award) {
            self.awards += 1;
        }
        fn on_duel_finished(&mut self, _duel: DuelId, _winner: Option<PlayerId>, _reason: FinishReason) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_dispatch_routes_hooks() {
        let duel = DuelId(1);
        let mut l = Counting::default();
        let symbol = Symbol::parse("STONE").unwrap();
        let events = [
            DuelEvent::PhaseChanged { phase: Phase::Playing },
            DuelEvent::PairFound {
                player: PlayerId(1),
                symbol,
                pairs: 1,
                streak: 1,
            },
            DuelEvent::Award(Award::new(PlayerId(1), 2, AwardReason::PairFound)),
            DuelEvent::Mismatch { player: PlayerId(2) },
            DuelEvent::Finished {
                winner: None,
                reason: FinishReason::Timeout,
            },
        ];
        for e in &events {
            e.dispatch(duel, &mut l);
        }
        assert_eq!(l.all, 5);
        assert_eq!((l.phases, l.pairs, l.awards, l.finished), (1, 1, 1, 1));
    }

    #[test]
    fn test_recording_listener_points() {
        let mut l = RecordingListener::new();
        DuelEvent::Award(Award::new(PlayerId(1), 2, AwardReason::PairFound)).dispatch(DuelId(1), &mut l);
        DuelEvent::Award(Award::new(PlayerId(1), 3, AwardReason::FirstPair)).dispatch(DuelId(1), &mut l);
        DuelEvent::Award(Award::new(PlayerId(2), 5, AwardReason::Participation)).dispatch(DuelId(1), &mut l);
        assert_eq!(l.points_for(PlayerId(1)), 5);
        assert_eq!(l.points_for(PlayerId(2)), 5);
    }
}
