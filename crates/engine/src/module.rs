//! The memory minigame module: scheduler plus lobby behind one entry point.

use std::sync::Arc;

use memory_duel_core::{Deck, DuelConfig, DuelPlayer, SelectionOutcome, SelectionRejected};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LobbyError, SchedulerError};
use crate::listener::SessionListener;
use crate::lobby::LobbyPairingService;
use crate::scheduler::SessionScheduler;
use crate::types::{Arena, BlockPos, DuelId, PlayerId};

/// Inbound events from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    SelectCell {
        player: PlayerId,
        pos: BlockPos,
    },
    JoinLobby {
        player: PlayerId,
        #[serde(default)]
        tournament_points: i64,
    },
    Leave {
        player: PlayerId,
    },
    StartRound,
}

#[derive(Debug)]
pub struct MemoryGame {
    scheduler: SessionScheduler,
    lobby: LobbyPairingService,
}

impl MemoryGame {
    /// Build the module. The deck has already been validated at load time.
    pub fn new(config: DuelConfig, deck: Deck, arena: &Arena, seed: u32) -> Result<Self, SchedulerError> {
        let feedback = config.lobby_feedback_ticks;
        let scheduler = SessionScheduler::new(config, Arc::new(deck), arena, seed)?;
        Ok(Self {
            scheduler,
            lobby: LobbyPairingService::new(feedback, seed.rotate_left(16)),
        })
    }

    pub fn scheduler(&self) -> &SessionScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SessionScheduler {
        &mut self.scheduler
    }

    pub fn lobby(&self) -> &LobbyPairingService {
        &self.lobby
    }

    /// Whether anything needs ticking.
    pub fn is_active(&self) -> bool {
        self.scheduler.is_running() || self.lobby.is_active()
    }

    pub fn tick<L: SessionListener + ?Sized>(&mut self, listener: &mut L) {
        self.scheduler.tick(listener);
        self.lobby.tick(listener);
    }

    pub fn select_cell<L: SessionListener + ?Sized>(
        &mut self,
        player: PlayerId,
        pos: BlockPos,
        listener: &mut L,
    ) -> Result<SelectionOutcome, SelectionRejected> {
        self.scheduler.select(player, pos, listener)
    }

    pub fn join_lobby<L: SessionListener + ?Sized>(
        &mut self,
        player: DuelPlayer,
        listener: &mut L,
    ) -> Result<usize, LobbyError> {
        match self.lobby.join(player, &self.scheduler) {
            Ok(waiting) => {
                listener.on_lobby_status(player.id, waiting);
                Ok(waiting)
            }
            Err(e) => {
                listener.on_feedback(player.id, &e.to_string());
                Err(e)
            }
        }
    }

    /// Remove a player from the lobby and from any duel.
    pub fn leave<L: SessionListener + ?Sized>(&mut self, player: PlayerId, listener: &mut L) {
        let queued = self.lobby.leave(player);
        let duel = self.scheduler.remove_player(player, listener);
        debug!(%player, queued, duel = ?duel, "player left");
    }

    pub fn start_round(&mut self) -> Result<Vec<DuelId>, LobbyError> {
        self.lobby.start_round(&mut self.scheduler)
    }

    /// Route one inbound event. Round errors are returned; everything else is
    /// reported to players through the listener.
    pub fn handle<L: SessionListener + ?Sized>(
        &mut self,
        event: InboundEvent,
        listener: &mut L,
    ) -> Result<(), LobbyError> {
        match event {
            InboundEvent::SelectCell { player, pos } => {
                let _ = self.select_cell(player, pos, listener);
            }
            InboundEvent::JoinLobby {
                player,
                tournament_points,
            } => {
                let _ = self.join_lobby(DuelPlayer::with_points(player, tournament_points), listener);
            }
            InboundEvent::Leave { player } => self.leave(player, listener),
            InboundEvent::StartRound => {
                self.start_round()?;
            }
        }
        Ok(())
    }
}
