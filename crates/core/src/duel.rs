//! Duel module - the two-player memory duel state machine
//!
//! A duel moves through `Memorizing → Playing → Finished` and advances exactly
//! one step per scheduler tick via [`Duel::advance`]. Player clicks arrive via
//! [`Duel::handle_selection`] between ticks.
//!
//! # Playing protocol
//!
//! - Only the turn holder's clock runs. When it hits zero the duel resolves
//!   on the same tick (timeout path) and input is closed at once.
//! - A turn is two selections. The first reveals a cell and keeps input open;
//!   the second reveals, closes input and evaluates the pair immediately.
//! - A match keeps the turn (extra action). A mismatch leaves both cells
//!   face-up for `mismatch_reveal_ticks`, then hides them and (optionally)
//!   hands the turn to the opponent.
//! - Matching the last pair finishes the duel in the same call.
//!
//! Input is gated by `accepting_input` so a click racing an expiring clock or
//! a pending evaluation is rejected rather than applied twice.

use std::sync::Arc;

use arrayvec::ArrayVec;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::board::{generate_board, Board};
use crate::config::DuelConfig;
use crate::deck::Deck;
use crate::error::{BoardError, DuelError};
use crate::events::DuelEvent;
use crate::rng::SimpleRng;
use crate::scoring::{
    calculate_pair_score, comeback_award, pair_awards, settle_completion, settle_forfeit,
    settle_timeout, Award, Settlement,
};
use crate::types::{BlockPos, DuelId, FinishReason, Parcel, ParcelId, Phase, PlayerId, Symbol};

/// A player entering a duel, with their standing in the wider tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelPlayer {
    pub id: PlayerId,
    pub tournament_points: i64,
}

impl DuelPlayer {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            tournament_points: 0,
        }
    }

    pub fn with_points(id: PlayerId, tournament_points: i64) -> Self {
        Self {
            id,
            tournament_points,
        }
    }
}

/// Result of an accepted selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// First cell of the turn revealed; a second selection is expected.
    FirstRevealed,
    /// Both cells matched. The same player keeps the turn unless the board is done.
    Matched { pairs: u32, finished: bool },
    /// Cells differ; they stay visible for the reveal delay.
    Mismatched,
}

/// Why a selection was refused. The message is shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionRejected {
    #[error("the duel is not in play")]
    NotPlaying,
    #[error("you are not part of this duel")]
    NotInDuel,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("wait a moment before selecting")]
    InputClosed,
    #[error("that is not a board cell")]
    NotACell,
    #[error("that pair is already matched")]
    AlreadyMatched,
    #[error("you already selected that cell")]
    AlreadySelected,
}

#[derive(Debug, Clone)]
pub struct Duel {
    id: DuelId,
    parcel: ParcelId,
    world: String,
    players: [PlayerId; 2],
    config: Arc<DuelConfig>,
    board: Board,
    phase: Phase,
    memorize_remaining: u32,
    time_left: [u32; 2],
    pairs: [u32; 2],
    streak: [u32; 2],
    /// Index into `players` of the turn holder.
    turn: usize,
    pending: ArrayVec<usize, 2>,
    accepting_input: bool,
    /// Ticks left before a mismatched pair is hidden (0 = no delay running).
    reveal_remaining: u32,
    first_pair_claimed: bool,
    tournament_points: [i64; 2],
    earned: [i64; 2],
    /// Largest tournament-point deficit each player has faced.
    max_deficit: [i64; 2],
    winner: Option<PlayerId>,
    finish_reason: Option<FinishReason>,
    ticks: u64,
    events: Vec<DuelEvent>,
}

impl Duel {
    /// Create a duel on `parcel`. The board is generated first, so a deck too
    /// small for the grid aborts creation before anything else happens.
    pub fn new(
        id: DuelId,
        parcel_id: ParcelId,
        parcel: &Parcel,
        players: [DuelPlayer; 2],
        config: Arc<DuelConfig>,
        deck: &Deck,
        rng: &mut SimpleRng,
    ) -> Result<Self, BoardError> {
        let mut board = generate_board(parcel, config.grid_size, deck, rng)?;
        board.reveal_all();

        let turn_time = config.turn_time_ticks;
        let memorize = config.memorize_ticks;
        let tournament_points = [players[0].tournament_points, players[1].tournament_points];

        let mut duel = Self {
            id,
            parcel: parcel_id,
            world: parcel.world.clone(),
            players: [players[0].id, players[1].id],
            config,
            board,
            phase: Phase::Memorizing,
            memorize_remaining: memorize,
            time_left: [turn_time; 2],
            pairs: [0; 2],
            streak: [0; 2],
            turn: 0,
            pending: ArrayVec::new(),
            accepting_input: false,
            reveal_remaining: 0,
            first_pair_claimed: false,
            tournament_points,
            earned: [0; 2],
            max_deficit: [0; 2],
            winner: None,
            finish_reason: None,
            ticks: 0,
            events: Vec::new(),
        };
        duel.update_deficits();
        duel.events.push(DuelEvent::PhaseChanged {
            phase: Phase::Memorizing,
        });

        info!(duel = %id, parcel = %parcel_id, a = %duel.players[0], b = %duel.players[1], "duel created");
        Ok(duel)
    }

    pub fn id(&self) -> DuelId {
        self.id
    }

    pub fn parcel(&self) -> ParcelId {
        self.parcel
    }

    pub fn players(&self) -> [PlayerId; 2] {
        self.players
    }

    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    fn index_of(&self, player: PlayerId) -> Option<usize> {
        self.players.iter().position(|&p| p == player)
    }

    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        self.index_of(player).map(|i| self.players[1 - i])
    }

    /// The player whose clock is running, only while playing.
    pub fn turn_holder(&self) -> Option<PlayerId> {
        (self.phase == Phase::Playing).then(|| self.players[self.turn])
    }

    pub fn time_left(&self, player: PlayerId) -> Option<u32> {
        self.index_of(player).map(|i| self.time_left[i])
    }

    pub fn pairs_found(&self, player: PlayerId) -> Option<u32> {
        self.index_of(player).map(|i| self.pairs[i])
    }

    pub fn streak(&self, player: PlayerId) -> Option<u32> {
        self.index_of(player).map(|i| self.streak[i])
    }

    /// Points this player earned in this duel so far.
    pub fn points(&self, player: PlayerId) -> Option<i64> {
        self.index_of(player).map(|i| self.earned[i])
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn accepting_input(&self) -> bool {
        self.accepting_input
    }

    pub fn memorize_remaining(&self) -> u32 {
        self.memorize_remaining
    }

    pub fn reveal_remaining(&self) -> u32 {
        self.reveal_remaining
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Take the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<DuelEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one tick. A no-op once finished.
    pub fn advance(&mut self) -> Result<(), DuelError> {
        match self.phase {
            Phase::Finished => return Ok(()),
            Phase::Memorizing => {
                self.ticks += 1;
                self.memorize_remaining = self.memorize_remaining.saturating_sub(1);
                if self.memorize_remaining == 0 {
                    self.start_playing();
                }
            }
            Phase::Playing => {
                self.ticks += 1;
                self.advance_playing();
            }
        }
        self.check_invariants()
    }

    fn start_playing(&mut self) {
        self.board.hide_unmatched();
        let positions = self.board.cells().iter().map(|c| c.pos).collect();
        self.events.push(DuelEvent::CellsHidden { positions });

        self.phase = Phase::Playing;
        self.events.push(DuelEvent::PhaseChanged {
            phase: Phase::Playing,
        });

        self.turn = 0;
        self.accepting_input = true;
        self.events.push(DuelEvent::TurnChanged {
            player: self.players[0],
        });
        debug!(duel = %self.id, "memorization over");
    }

    fn advance_playing(&mut self) {
        let t = self.turn;
        self.time_left[t] = self.time_left[t].saturating_sub(1);
        if self.time_left[t] == 0 {
            // Close the window before resolving so an in-flight click can't land.
            self.accepting_input = false;
            self.resolve_timeout();
            return;
        }

        if self.reveal_remaining > 0 {
            self.reveal_remaining -= 1;
            if self.reveal_remaining == 0 {
                self.end_mismatch_reveal();
            }
        }
    }

    fn end_mismatch_reveal(&mut self) {
        let positions: Vec<BlockPos> = self
            .pending
            .iter()
            .filter_map(|&i| self.board.cell(i).map(|c| c.pos))
            .collect();
        for &i in &self.pending {
            self.board.hide(i);
        }
        self.pending.clear();
        self.events.push(DuelEvent::CellsHidden { positions });

        if self.config.change_turn_on_fail {
            self.pass_turn();
        }
        self.accepting_input = true;
    }

    fn pass_turn(&mut self) {
        self.streak[self.turn] = 0;
        self.turn = 1 - self.turn;
        self.events.push(DuelEvent::TurnChanged {
            player: self.players[self.turn],
        });
    }

    /// Apply a player's click on `pos`.
    pub fn handle_selection(
        &mut self,
        player: PlayerId,
        pos: BlockPos,
    ) -> Result<SelectionOutcome, SelectionRejected> {
        if self.phase != Phase::Playing {
            return Err(SelectionRejected::NotPlaying);
        }
        let Some(idx) = self.index_of(player) else {
            return Err(SelectionRejected::NotInDuel);
        };
        if idx != self.turn {
            return Err(SelectionRejected::NotYourTurn);
        }
        if !self.accepting_input {
            return Err(SelectionRejected::InputClosed);
        }
        let Some(cell_index) = self.board.index_of(pos) else {
            return Err(SelectionRejected::NotACell);
        };
        let Some(cell) = self.board.cell(cell_index) else {
            return Err(SelectionRejected::NotACell);
        };
        if cell.matched {
            return Err(SelectionRejected::AlreadyMatched);
        }
        if self.pending.contains(&cell_index) {
            return Err(SelectionRejected::AlreadySelected);
        }
        let symbol = cell.symbol.clone();

        self.board.reveal(cell_index);
        self.events.push(DuelEvent::CellRevealed { player, pos, symbol });
        if self.pending.try_push(cell_index).is_err() {
            // Unreachable while the gate closes on the second selection.
            return Err(SelectionRejected::InputClosed);
        }

        if self.pending.len() == 1 {
            return Ok(SelectionOutcome::FirstRevealed);
        }

        self.accepting_input = false;
        Ok(self.evaluate_pair())
    }

    fn evaluate_pair(&mut self) -> SelectionOutcome {
        let (a, b) = (self.pending[0], self.pending[1]);
        let t = self.turn;
        let player = self.players[t];

        if !self.board.same_symbol(a, b) {
            self.streak[t] = 0;
            self.reveal_remaining = self.config.mismatch_reveal_ticks.max(1);
            self.events.push(DuelEvent::Mismatch { player });
            debug!(duel = %self.id, %player, "mismatch");
            return SelectionOutcome::Mismatched;
        }

        self.board.mark_matched(a);
        self.board.mark_matched(b);
        self.pending.clear();
        self.pairs[t] += 1;
        self.streak[t] += 1;

        let first_of_duel = !self.first_pair_claimed;
        self.first_pair_claimed = true;

        let symbol: Option<Symbol> = self.board.cell(a).map(|c| c.symbol.clone());
        if let Some(symbol) = symbol {
            self.events.push(DuelEvent::PairFound {
                player,
                symbol,
                pairs: self.pairs[t],
                streak: self.streak[t],
            });
        }

        let score = calculate_pair_score(&self.config.scoring, self.streak[t], first_of_duel);
        for award in pair_awards(player, &score) {
            self.grant(award);
        }

        let pairs = self.pairs[t];
        if self.board.is_complete() {
            let settlement = settle_completion(&self.config.scoring, self.players, self.pairs);
            self.finish(settlement, FinishReason::Completed);
            return SelectionOutcome::Matched {
                pairs,
                finished: true,
            };
        }

        self.accepting_input = true;
        SelectionOutcome::Matched {
            pairs,
            finished: false,
        }
    }

    fn resolve_timeout(&mut self) {
        let settlement = settle_timeout(&self.config.scoring, self.players, self.pairs);
        self.finish(settlement, FinishReason::Timeout);
    }

    /// Force-finish because `leaver` left; the opponent wins.
    ///
    /// Returns `false` if the duel was already finished or `leaver` is not in it.
    pub fn forfeit(&mut self, leaver: PlayerId) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        let Some(winner) = self.opponent_of(leaver) else {
            return false;
        };
        let settlement = settle_forfeit(&self.config.scoring, winner);
        self.finish(settlement, FinishReason::Forfeit);
        true
    }

    fn grant(&mut self, award: Award) {
        if let Some(i) = self.index_of(award.player) {
            self.earned[i] = self.earned[i].saturating_add(award.points);
        }
        self.events.push(DuelEvent::Award(award));
        self.update_deficits();
    }

    fn update_deficits(&mut self) {
        if !self.config.scoring.comeback_enabled {
            return;
        }
        // External points are caller-supplied; any i64 must be tolerated.
        let totals = [
            self.tournament_points[0].saturating_add(self.earned[0]),
            self.tournament_points[1].saturating_add(self.earned[1]),
        ];
        for i in 0..2 {
            let deficit = totals[1 - i].saturating_sub(totals[i]);
            self.max_deficit[i] = self.max_deficit[i].max(deficit);
        }
    }

    fn finish(&mut self, settlement: Settlement, reason: FinishReason) {
        self.phase = Phase::Finished;
        self.accepting_input = false;
        self.reveal_remaining = 0;
        self.winner = settlement.winner;
        self.finish_reason = Some(reason);

        for award in settlement.awards {
            self.grant(award);
        }
        if let Some(winner) = self.winner {
            let deficit = self.index_of(winner).map_or(0, |i| self.max_deficit[i]);
            if let Some(award) = comeback_award(&self.config.scoring, winner, deficit) {
                self.grant(award);
            }
        }

        self.events.push(DuelEvent::PhaseChanged {
            phase: Phase::Finished,
        });
        self.events.push(DuelEvent::Finished {
            winner: self.winner,
            reason,
        });
        info!(duel = %self.id, reason = reason.as_str(), winner = ?self.winner, "duel finished");
    }

    /// Tear the board down once the duel is being removed.
    pub fn teardown(&mut self) {
        self.board.clear();
        self.pending.clear();
        self.events.push(DuelEvent::BoardCleared);
    }

    pub fn check_invariants(&self) -> Result<(), DuelError> {
        if self.pending.len() > 2 {
            return Err(DuelError::PendingOverflow(self.pending.len()));
        }
        let matched = self.board.matched_count();
        if matched > self.board.len() {
            return Err(DuelError::MatchedOverflow {
                matched,
                total: self.board.len(),
            });
        }
        if !self.board.is_empty() {
            let counted = self.pairs[0] + self.pairs[1];
            if counted as usize * 2 != matched {
                return Err(DuelError::PairCountMismatch { counted, matched });
            }
        }
        if self.board.is_complete() && !self.phase.is_terminal() {
            return Err(DuelError::CompleteNotFinished(self.phase.as_str()));
        }
        Ok(())
    }

    /// Serializable view for scoreboards. Face-down symbols are withheld.
    pub fn snapshot(&self) -> DuelSnapshot {
        DuelSnapshot {
            id: self.id,
            parcel: self.parcel,
            world: self.world.clone(),
            phase: self.phase,
            turn_holder: self.turn_holder(),
            accepting_input: self.accepting_input,
            memorize_remaining: self.memorize_remaining,
            players: [0, 1].map(|i| PlayerSnapshot {
                id: self.players[i],
                time_left: self.time_left[i],
                pairs: self.pairs[i],
                streak: self.streak[i],
                points: self.earned[i],
            }),
            cells: self
                .board
                .cells()
                .iter()
                .map(|c| CellView {
                    pos: c.pos,
                    symbol: c.revealed.then(|| c.symbol.clone()),
                    matched: c.matched,
                })
                .collect(),
            winner: self.winner,
            finish_reason: self.finish_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub time_left: u32,
    pub pairs: u32,
    pub streak: u32,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub pos: BlockPos,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuelSnapshot {
    pub id: DuelId,
    pub parcel: ParcelId,
    pub world: String,
    pub phase: Phase,
    pub turn_holder: Option<PlayerId>,
    pub accepting_input: bool,
    pub memorize_remaining: u32,
    pub players: [PlayerSnapshot; 2],
    pub cells: Vec<CellView>,
    pub winner: Option<PlayerId>,
    pub finish_reason: Option<FinishReason>,
}
