//! Session scheduler - the single tick driver for every duel
//!
//! One [`SessionScheduler`] owns the registry, the parcel allocator and the
//! shared deck. Each [`tick`](SessionScheduler::tick) advances all duels in
//! registration order. A duel that panics or breaks an invariant is rolled
//! back to its state from before the tick and the loop moves on.
//!
//! Finished duels linger for `cleanup_delay_ticks` so clients can see the
//! final board, then are torn down and their parcel released. A player who
//! leaves mid-duel forfeits, and that duel is removed immediately.
//!
//! The scheduler is idle while no duel is registered; `tick` is a no-op then.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use memory_duel_core::{
    BoardError, Deck, Duel, DuelConfig, DuelError, DuelEvent, DuelPlayer, SelectionOutcome,
    SelectionRejected, SimpleRng,
};
use tracing::{debug, error, info, trace};

use crate::allocator::ResourceAllocator;
use crate::error::{RegistryError, SchedulerError};
use crate::listener::SessionListener;
use crate::registry::{DuelEntry, SessionRegistry};
use crate::types::{Arena, BlockPos, DuelId, PlayerId};

#[derive(Debug)]
pub struct SessionScheduler {
    config: Arc<DuelConfig>,
    deck: Arc<Deck>,
    allocator: ResourceAllocator,
    registry: SessionRegistry,
    rng: SimpleRng,
    next_id: u64,
    tick: u64,
    running: bool,
}

fn dispatch_all<L: SessionListener + ?Sized>(duel: DuelId, events: Vec<DuelEvent>, listener: &mut L) {
    for event in &events {
        event.dispatch(duel, listener);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl SessionScheduler {
    pub fn new(
        config: DuelConfig,
        deck: Arc<Deck>,
        arena: &Arena,
        seed: u32,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            deck,
            allocator: ResourceAllocator::from_arena(arena),
            registry: SessionRegistry::new(),
            rng: SimpleRng::new(seed),
            next_id: 1,
            tick: 0,
            running: false,
        })
    }

    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn free_parcels(&self) -> usize {
        self.allocator.free_count()
    }

    pub fn duel(&self, id: DuelId) -> Option<&Duel> {
        self.registry.get(id).map(|e| &e.duel)
    }

    pub fn duel_of(&self, player: PlayerId) -> Option<DuelId> {
        self.registry.duel_of(player)
    }

    /// Whether `duels` more duels could be created right now.
    pub fn can_host(&self, duels: usize) -> Result<(), SchedulerError> {
        let free = self.allocator.free_count();
        if duels > free {
            return Err(SchedulerError::NoFreeParcels {
                needed: duels,
                free,
            });
        }
        let required = self.config.pairs_required();
        if duels > 0 && !self.deck.can_supply(required) {
            return Err(BoardError::InsufficientSymbols {
                required,
                available: self.deck.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Allocate a parcel, build the duel and register it.
    ///
    /// The board is generated before registration; if it fails the parcel is
    /// released and nothing else changes.
    pub fn create_duel(&mut self, a: DuelPlayer, b: DuelPlayer) -> Result<DuelId, SchedulerError> {
        if a.id == b.id {
            return Err(RegistryError::SamePlayer(a.id).into());
        }
        for player in [a.id, b.id] {
            if let Some(duel) = self.registry.duel_of(player) {
                return Err(RegistryError::PlayerBusy { player, duel }.into());
            }
        }

        let id = DuelId(self.next_id);
        let parcel_id = self.allocator.allocate(id)?;
        let parcel = match self.allocator.parcel(parcel_id) {
            Some(p) => p.clone(),
            None => {
                self.allocator.release(parcel_id);
                return Err(SchedulerError::ParcelNotBound {
                    duel: id,
                    parcel: parcel_id,
                });
            }
        };

        let mut rng = self.rng.fork();
        let duel = match Duel::new(
            id,
            parcel_id,
            &parcel,
            [a, b],
            Arc::clone(&self.config),
            &self.deck,
            &mut rng,
        ) {
            Ok(duel) => duel,
            Err(e) => {
                self.allocator.release(parcel_id);
                error!(duel = %id, error = %e, "duel creation failed");
                return Err(e.into());
            }
        };

        self.next_id += 1;
        self.register_duel(duel)
    }

    /// Register a duel built elsewhere. Its parcel must already be bound to it.
    ///
    /// If either player is already in a duel, the parcel is released and the
    /// duel dropped.
    pub fn register_duel(&mut self, duel: Duel) -> Result<DuelId, SchedulerError> {
        let id = duel.id();
        let parcel = duel.parcel();
        if self.allocator.bound_to(parcel) != Some(id) {
            return Err(SchedulerError::ParcelNotBound { duel: id, parcel });
        }
        if let Err(e) = self.registry.insert(duel) {
            self.allocator.release(parcel);
            return Err(e.into());
        }
        self.next_id = self.next_id.max(id.0 + 1);

        if !self.running {
            self.running = true;
            info!("scheduler started");
        }
        Ok(id)
    }

    /// Advance every duel by one tick. Returns the number of duels advanced.
    pub fn tick<L: SessionListener + ?Sized>(&mut self, listener: &mut L) -> usize {
        self.tick_with(listener, Duel::advance)
    }

    fn tick_with<L, F>(&mut self, listener: &mut L, mut step: F) -> usize
    where
        L: SessionListener + ?Sized,
        F: FnMut(&mut Duel) -> Result<(), DuelError>,
    {
        if !self.running {
            return 0;
        }
        self.tick += 1;
        let now = self.tick;
        let delay = u64::from(self.config.cleanup_delay_ticks);
        let mut advanced = 0;

        for id in self.registry.ids() {
            let Some(entry) = self.registry.get_mut(id) else {
                continue;
            };
            if !entry.duel.phase().is_terminal() && Self::run_isolated(id, entry, &mut step) {
                advanced += 1;
            }
            let events = entry.duel.take_events();
            Self::schedule_cleanup(entry, now, delay);
            dispatch_all(id, events, listener);
            listener.on_duel_state(&entry.duel.snapshot());
        }

        let due: Vec<DuelId> = self
            .registry
            .iter()
            .filter(|(_, e)| e.cleanup_at.is_some_and(|at| at <= now))
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            self.remove_duel(id, listener);
        }

        trace!(tick = now, advanced, "tick");
        self.stop_if_idle();
        advanced
    }

    /// Run `step` on the duel; on panic or error restore the pre-step state.
    /// Returns `false` if the step was rolled back.
    fn run_isolated<F>(id: DuelId, entry: &mut DuelEntry, step: F) -> bool
    where
        F: FnOnce(&mut Duel) -> Result<(), DuelError>,
    {
        let checkpoint = entry.duel.clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| step(&mut entry.duel)));
        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(duel = %id, error = %e, "duel invariant broken, rolled back");
                entry.duel = checkpoint;
                false
            }
            Err(payload) => {
                error!(duel = %id, panic = %panic_message(payload.as_ref()), "duel panicked, rolled back");
                entry.duel = checkpoint;
                false
            }
        }
    }

    fn schedule_cleanup(entry: &mut DuelEntry, now: u64, delay: u64) {
        if entry.duel.phase().is_terminal() && entry.cleanup_at.is_none() {
            entry.cleanup_at = Some(now + delay);
        }
    }

    fn remove_duel<L: SessionListener + ?Sized>(&mut self, id: DuelId, listener: &mut L) {
        let Some(mut entry) = self.registry.remove(id) else {
            return;
        };
        entry.duel.teardown();
        dispatch_all(id, entry.duel.take_events(), listener);
        let parcel = entry.duel.parcel();
        self.allocator.release(parcel);
        listener.on_duel_removed(id, parcel);
        info!(duel = %id, %parcel, "duel removed");
    }

    /// Drop a duel without settling it. Used to roll back a partially created round.
    pub(crate) fn discard_duel(&mut self, id: DuelId) -> bool {
        let Some(entry) = self.registry.remove(id) else {
            return false;
        };
        self.allocator.release(entry.duel.parcel());
        debug!(duel = %id, "duel discarded");
        self.stop_if_idle();
        true
    }

    fn stop_if_idle(&mut self) {
        if self.running && self.registry.is_empty() {
            self.running = false;
            info!(tick = self.tick, "scheduler idle");
        }
    }

    /// A player left. An active duel is forfeited and removed at once; a
    /// finished duel keeps its grace period and only loses the mapping.
    pub fn remove_player<L: SessionListener + ?Sized>(
        &mut self,
        player: PlayerId,
        listener: &mut L,
    ) -> Option<DuelId> {
        let id = self.registry.duel_of(player)?;
        let finished = self.registry.get(id).map(|e| e.duel.phase().is_terminal());
        match finished {
            None => {
                self.registry.unmap_player(player);
                return None;
            }
            Some(true) => {
                self.registry.unmap_player(player);
                debug!(%player, duel = %id, "player left finished duel");
                return Some(id);
            }
            Some(false) => {}
        }

        info!(%player, duel = %id, "player left, forfeit");
        if let Some(entry) = self.registry.get_mut(id) {
            entry.duel.forfeit(player);
            let events = entry.duel.take_events();
            dispatch_all(id, events, listener);
        }
        self.remove_duel(id, listener);
        self.stop_if_idle();
        Some(id)
    }

    /// Route a selection to the player's duel.
    pub fn select<L: SessionListener + ?Sized>(
        &mut self,
        player: PlayerId,
        pos: BlockPos,
        listener: &mut L,
    ) -> Result<SelectionOutcome, SelectionRejected> {
        let entry = self
            .registry
            .duel_of(player)
            .and_then(|id| self.registry.get_mut(id).map(|e| (id, e)));
        let Some((id, entry)) = entry else {
            let reason = SelectionRejected::NotInDuel;
            listener.on_feedback(player, &reason.to_string());
            return Err(reason);
        };

        let result = entry.duel.handle_selection(player, pos);
        match &result {
            Ok(outcome) => {
                trace!(%player, duel = %id, ?outcome, "selection");
                let events = entry.duel.take_events();
                Self::schedule_cleanup(entry, self.tick, u64::from(self.config.cleanup_delay_ticks));
                dispatch_all(id, events, listener);
            }
            Err(reason) => {
                debug!(%player, duel = %id, %reason, "selection rejected");
                listener.on_feedback(player, &reason.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_duel_core::types::Phase;
    use memory_duel_core::DuelListener;

    use crate::types::{Parcel, ParcelId};

    #[derive(Default)]
    struct Log {
        removed: Vec<(DuelId, ParcelId)>,
        feedback: Vec<(PlayerId, String)>,
        finished: Vec<DuelId>,
    }

    impl DuelListener for Log {
        fn on_duel_finished(
            &mut self,
            duel: DuelId,
            _winner: Option<PlayerId>,
            _reason: memory_duel_core::types::FinishReason,
        ) {
            self.finished.push(duel);
        }
    }

    impl SessionListener for Log {
        fn on_feedback(&mut self, player: PlayerId, message: &str) {
            self.feedback.push((player, message.to_string()));
        }
        fn on_duel_removed(&mut self, duel: DuelId, parcel: ParcelId) {
            self.removed.push((duel, parcel));
        }
    }

    fn arena(parcels: i32) -> Arena {
        Arena::new(
            "test",
            (0..parcels)
                .map(|i| Parcel::from_corners("w", BlockPos::new(i * 20, 64, 0), BlockPos::new(i * 20 + 9, 70, 9)))
                .collect(),
        )
    }

    fn scheduler(parcels: i32) -> SessionScheduler {
        let config = DuelConfig {
            grid_size: 2,
            memorize_ticks: 2,
            turn_time_ticks: 100,
            cleanup_delay_ticks: 3,
            ..DuelConfig::default()
        };
        let deck = Arc::new(Deck::new(["A", "B", "C"]).unwrap());
        SessionScheduler::new(config, deck, &arena(parcels), 11).unwrap()
    }

    /// Bind a parcel for a duel the test builds by hand.
    fn reserve_parcel(s: &mut SessionScheduler) -> (DuelId, ParcelId) {
        let id = DuelId(s.next_id);
        let parcel = s.allocator.allocate(id).unwrap();
        s.next_id += 1;
        (id, parcel)
    }

    fn p(id: u64) -> DuelPlayer {
        DuelPlayer::new(PlayerId(id))
    }

    #[test]
    fn test_idle_until_first_duel() {
        let mut s = scheduler(1);
        assert!(!s.is_running());
        assert_eq!(s.tick(&mut Log::default()), 0);
        assert_eq!(s.current_tick(), 0);

        s.create_duel(p(1), p(2)).unwrap();
        assert!(s.is_running());
        assert_eq!(s.tick(&mut Log::default()), 1);
    }

    #[test]
    fn test_create_refuses_busy_player_without_binding() {
        let mut s = scheduler(2);
        s.create_duel(p(1), p(2)).unwrap();
        assert!(matches!(
            s.create_duel(p(3), p(2)),
            Err(SchedulerError::Registry(_))
        ));
        assert_eq!(s.free_parcels(), 1);
        assert!(s.registry().check_consistency().is_ok());
    }

    #[test]
    fn test_create_fails_on_small_deck() {
        let deck = Arc::new(Deck::new(["A"]).unwrap());
        let config = DuelConfig {
            grid_size: 2,
            ..DuelConfig::default()
        };
        let mut s = SessionScheduler::new(config, deck, &arena(1), 1).unwrap();
        assert!(matches!(
            s.create_duel(p(1), p(2)),
            Err(SchedulerError::Board(BoardError::InsufficientSymbols { .. }))
        ));
        assert_eq!(s.free_parcels(), 1);
        assert!(!s.is_running());
    }

    #[test]
    fn test_register_duel_refusal_releases_parcel() {
        let mut s = scheduler(2);
        s.create_duel(p(1), p(2)).unwrap();

        let (id, parcel_id) = reserve_parcel(&mut s);
        let parcel = s.allocator().parcel(parcel_id).unwrap().clone();
        let duel = Duel::new(
            id,
            parcel_id,
            &parcel,
            [p(2), p(3)],
            Arc::new(s.config().clone()),
            s.deck(),
            &mut SimpleRng::new(5),
        )
        .unwrap();
        assert!(s.register_duel(duel).is_err());
        assert_eq!(s.allocator().bound_to(parcel_id), None);
    }

    #[test]
    fn test_finished_duel_removed_after_grace() {
        let mut s = scheduler(1);
        let mut log = Log::default();
        let id = s.create_duel(p(1), p(2)).unwrap();
        s.tick(&mut log);
        s.tick(&mut log);
        assert_eq!(s.duel(id).unwrap().phase(), Phase::Playing);

        let pairs: Vec<_> = {
            let board = s.duel(id).unwrap().board();
            let mut by_pair = std::collections::BTreeMap::<u16, Vec<BlockPos>>::new();
            for c in board.cells() {
                by_pair.entry(c.pair_id).or_default().push(c.pos);
            }
            by_pair.into_values().collect()
        };
        for pair in &pairs {
            s.select(PlayerId(1), pair[0], &mut log).unwrap();
            s.select(PlayerId(1), pair[1], &mut log).unwrap();
        }
        assert_eq!(log.finished, vec![id]);
        assert_eq!(s.free_parcels(), 0);

        // Grace period: still registered for a few ticks.
        s.tick(&mut log);
        s.tick(&mut log);
        assert!(s.duel(id).is_some());
        s.tick(&mut log);
        assert!(s.duel(id).is_none());
        assert_eq!(log.removed, vec![(id, ParcelId(0))]);
        assert_eq!(s.free_parcels(), 1);
        assert!(!s.is_running());
    }

    #[test]
    fn test_remove_player_forfeits_immediately() {
        let mut s = scheduler(1);
        let mut log = Log::default();
        let id = s.create_duel(p(1), p(2)).unwrap();
        s.tick(&mut log);

        assert_eq!(s.remove_player(PlayerId(2), &mut log), Some(id));
        assert_eq!(log.finished, vec![id]);
        assert_eq!(log.removed, vec![(id, ParcelId(0))]);
        assert_eq!(s.duel_of(PlayerId(1)), None);
        assert_eq!(s.free_parcels(), 1);
        assert!(!s.is_running());
        assert_eq!(s.remove_player(PlayerId(2), &mut log), None);
    }

    #[test]
    fn test_select_outside_duel_gives_feedback() {
        let mut s = scheduler(1);
        let mut log = Log::default();
        assert_eq!(
            s.select(PlayerId(9), BlockPos::new(0, 0, 0), &mut log),
            Err(SelectionRejected::NotInDuel)
        );
        assert_eq!(log.feedback.len(), 1);
    }

    #[test]
    fn test_panicking_duel_is_rolled_back() {
        let mut s = scheduler(2);
        let a = s.create_duel(p(1), p(2)).unwrap();
        let b = s.create_duel(p(3), p(4)).unwrap();
        s.tick(&mut Log::default());

        let entry = s.registry.get_mut(a).unwrap();
        let before = entry.duel.snapshot();
        let ok = SessionScheduler::run_isolated(a, entry, |duel| {
            duel.forfeit(PlayerId(1));
            panic!("boom");
        });
        assert!(!ok);
        assert_eq!(entry.duel.snapshot(), before);

        // The other duel and the faulty one keep ticking.
        s.tick(&mut Log::default());
        assert_eq!(s.duel(a).unwrap().phase(), Phase::Playing);
        assert_eq!(s.duel(b).unwrap().phase(), Phase::Playing);
    }

    #[test]
    fn test_failing_duel_does_not_stop_the_tick() {
        let mut s = scheduler(3);
        let a = s.create_duel(p(1), p(2)).unwrap();
        let b = s.create_duel(p(3), p(4)).unwrap();
        let c = s.create_duel(p(5), p(6)).unwrap();
        s.tick(&mut Log::default());
        let ticks = |s: &SessionScheduler, id| s.duel(id).unwrap().ticks();
        let before = [ticks(&s, a), ticks(&s, b), ticks(&s, c)];

        let advanced = s.tick_with(&mut Log::default(), |duel| {
            if duel.id() == b {
                duel.forfeit(PlayerId(3));
                panic!("boom");
            }
            duel.advance()
        });

        assert_eq!(advanced, 2);
        assert_eq!(ticks(&s, a), before[0] + 1);
        assert_eq!(ticks(&s, b), before[1]);
        assert_eq!(ticks(&s, c), before[2] + 1);
        assert_eq!(s.duel(b).unwrap().phase(), Phase::Memorizing);
        assert_eq!(s.free_parcels(), 0);

        // Back to normal on the next tick.
        assert_eq!(s.tick(&mut Log::default()), 3);
        assert_eq!(s.duel(b).unwrap().phase(), Phase::Playing);
        assert!(s.registry().check_consistency().is_ok());
    }

    #[test]
    fn test_invariant_error_is_rolled_back() {
        let mut s = scheduler(1);
        let a = s.create_duel(p(1), p(2)).unwrap();
        let entry = s.registry.get_mut(a).unwrap();
        let ticks = entry.duel.ticks();
        let ok = SessionScheduler::run_isolated(a, entry, |duel| {
            duel.advance()?;
            Err(DuelError::PendingOverflow(3))
        });
        assert!(!ok);
        assert_eq!(entry.duel.ticks(), ticks);
    }

    #[test]
    fn test_can_host() {
        let s = scheduler(2);
        assert!(s.can_host(2).is_ok());
        assert_eq!(
            s.can_host(3),
            Err(SchedulerError::NoFreeParcels { needed: 3, free: 2 })
        );
    }
}
