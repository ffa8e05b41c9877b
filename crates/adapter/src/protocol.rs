//! Outbound messages and the listener that produces them.
//!
//! Every message is a JSON object tagged by `type`:
//!
//! - `duel_state`: per-tick scoreboard snapshot of one duel
//! - `cue`: sound/visual trigger (phase change, pair found, mismatch, turn, finish)
//! - `feedback`: player-facing text (rejections, lobby status)
//! - `score`: ledger submission, keyed by player and game name
//! - `duel_removed`: a duel was torn down and its parcel freed

use memory_duel_core::{Award, DuelEvent, DuelListener, DuelSnapshot};
use memory_duel_engine::SessionListener;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::types::{DuelId, FinishReason, ParcelId, Phase, PlayerId, Symbol, GAME_NAME};

/// One ledger entry: a point delta for a player in this game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub player: PlayerId,
    pub game: String,
    pub delta: i64,
    pub reason: String,
}

impl From<&Award> for ScoreSubmission {
    fn from(award: &Award) -> Self {
        Self {
            player: award.player,
            game: GAME_NAME.to_string(),
            delta: award.points,
            reason: award.reason.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cue {
    PhaseChanged { phase: Phase },
    PairFound { player: PlayerId, symbol: Symbol },
    Mismatch { player: PlayerId },
    TurnChanged { player: PlayerId },
    Finished { winner: Option<PlayerId>, reason: FinishReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    DuelState { snapshot: DuelSnapshot },
    Cue { duel: DuelId, cue: Cue },
    Feedback { player: PlayerId, message: String },
    Score(ScoreSubmission),
    DuelRemoved { duel: DuelId, parcel: ParcelId },
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn cue_for(event: &DuelEvent) -> Option<Cue> {
    let cue = match event {
        DuelEvent::PhaseChanged { phase } => Cue::PhaseChanged { phase: *phase },
        DuelEvent::PairFound { player, symbol, .. } => Cue::PairFound {
            player: *player,
            symbol: symbol.clone(),
        },
        DuelEvent::Mismatch { player } => Cue::Mismatch { player: *player },
        DuelEvent::TurnChanged { player } => Cue::TurnChanged { player: *player },
        DuelEvent::Finished { winner, reason } => Cue::Finished {
            winner: *winner,
            reason: *reason,
        },
        _ => return None,
    };
    Some(cue)
}

/// Turns engine callbacks into [`OutboundMessage`]s on a broadcast channel,
/// and forwards score submissions to the ledger writer if one is attached.
///
/// Sends never block; with no subscribers the messages are simply dropped.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    out: broadcast::Sender<OutboundMessage>,
    ledger: Option<mpsc::UnboundedSender<ScoreSubmission>>,
}

impl ChannelListener {
    pub fn new(
        out: broadcast::Sender<OutboundMessage>,
        ledger: Option<mpsc::UnboundedSender<ScoreSubmission>>,
    ) -> Self {
        Self { out, ledger }
    }

    fn emit(&self, msg: OutboundMessage) {
        let _ = self.out.send(msg);
    }
}

impl DuelListener for ChannelListener {
    fn on_event(&mut self, duel: DuelId, event: &DuelEvent) {
        if let Some(cue) = cue_for(event) {
            self.emit(OutboundMessage::Cue { duel, cue });
        }
    }

    fn on_award(&mut self, _duel: DuelId, award: &Award) {
        let submission = ScoreSubmission::from(award);
        if let Some(ledger) = &self.ledger {
            let _ = ledger.send(submission.clone());
        }
        self.emit(OutboundMessage::Score(submission));
    }
}

impl SessionListener for ChannelListener {
    fn on_feedback(&mut self, player: PlayerId, message: &str) {
        self.emit(OutboundMessage::Feedback {
            player,
            message: message.to_string(),
        });
    }

    fn on_lobby_status(&mut self, player: PlayerId, waiting: usize) {
        let message = if waiting == 1 {
            "1 player waiting".to_string()
        } else {
            format!("{waiting} players waiting")
        };
        self.emit(OutboundMessage::Feedback { player, message });
    }

    fn on_duel_state(&mut self, snapshot: &DuelSnapshot) {
        self.emit(OutboundMessage::DuelState {
            snapshot: snapshot.clone(),
        });
    }

    fn on_duel_removed(&mut self, duel: DuelId, parcel: ParcelId) {
        self.emit(OutboundMessage::DuelRemoved { duel, parcel });
    }
}
