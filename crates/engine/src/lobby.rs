//! Lobby pairing - batch player intake and fair pairing into duels
//!
//! Players queue with [`LobbyPairingService::join`]. An admin trigger calls
//! [`start_round`](LobbyPairingService::start_round), which either turns the
//! whole waiting list into duels or changes nothing and says why.

use memory_duel_core::{DuelPlayer, SimpleRng};
use tracing::{info, warn};

use crate::error::{LobbyError, SchedulerError};
use crate::listener::SessionListener;
use crate::scheduler::SessionScheduler;
use crate::types::{DuelId, PlayerId};

#[derive(Debug, Clone)]
pub struct LobbyPairingService {
    waiting: Vec<DuelPlayer>,
    rng: SimpleRng,
    feedback_period: u32,
    since_feedback: u32,
}

impl LobbyPairingService {
    pub fn new(feedback_period: u32, seed: u32) -> Self {
        Self {
            waiting: Vec::new(),
            rng: SimpleRng::new(seed),
            feedback_period: feedback_period.max(1),
            since_feedback: 0,
        }
    }

    /// Queue a player. Returns the number of players now waiting.
    pub fn join(
        &mut self,
        player: DuelPlayer,
        scheduler: &SessionScheduler,
    ) -> Result<usize, LobbyError> {
        if self.is_waiting(player.id) {
            return Err(LobbyError::AlreadyQueued(player.id));
        }
        if scheduler.duel_of(player.id).is_some() {
            return Err(LobbyError::AlreadyInDuel(player.id));
        }
        self.waiting.push(player);
        Ok(self.waiting.len())
    }

    pub fn leave(&mut self, player: PlayerId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|p| p.id != player);
        self.waiting.len() != before
    }

    pub fn is_waiting(&self, player: PlayerId) -> bool {
        self.waiting.iter().any(|p| p.id == player)
    }

    pub fn waiting(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.waiting.iter().map(|p| p.id)
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_active(&self) -> bool {
        !self.waiting.is_empty()
    }

    /// Send every waiting player the queue size once per feedback period.
    pub fn tick<L: SessionListener + ?Sized>(&mut self, listener: &mut L) {
        if self.waiting.is_empty() {
            self.since_feedback = 0;
            return;
        }
        self.since_feedback += 1;
        if self.since_feedback < self.feedback_period {
            return;
        }
        self.since_feedback = 0;
        let count = self.waiting.len();
        for p in &self.waiting {
            listener.on_lobby_status(p.id, count);
        }
    }

    /// Pair everyone waiting into duels.
    ///
    /// Validation happens before anything is touched. If a duel still fails
    /// to come up, the ones already created for this round are discarded and
    /// the waiting list is left as it was.
    pub fn start_round(
        &mut self,
        scheduler: &mut SessionScheduler,
    ) -> Result<Vec<DuelId>, LobbyError> {
        let waiting = self.waiting.len();
        if waiting == 0 {
            return Err(LobbyError::Empty);
        }
        if waiting % 2 != 0 {
            warn!(waiting, "round rejected: odd player count");
            return Err(LobbyError::OddCount { waiting });
        }

        let needed = waiting / 2;
        match scheduler.can_host(needed) {
            Ok(()) => {}
            Err(SchedulerError::NoFreeParcels { needed, free }) => {
                warn!(needed, free, "round rejected: not enough parcels");
                return Err(LobbyError::NotEnoughParcels { needed, free });
            }
            Err(e) => {
                warn!(error = %e, "round rejected");
                return Err(e.into());
            }
        }

        let mut rng = self.rng.clone();
        let mut order = self.waiting.clone();
        rng.shuffle(&mut order);

        let mut created = Vec::with_capacity(needed);
        for pair in order.chunks_exact(2) {
            match scheduler.create_duel(pair[0], pair[1]) {
                Ok(id) => created.push(id),
                Err(e) => {
                    for id in created {
                        scheduler.discard_duel(id);
                    }
                    warn!(error = %e, "round aborted, rolled back");
                    return Err(e.into());
                }
            }
        }

        self.rng = rng;
        self.waiting.clear();
        self.since_feedback = 0;
        info!(duels = created.len(), "round started");
        Ok(created)
    }
}
