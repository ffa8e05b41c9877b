//! End-to-end duel scenarios: completion, timeout tie, deck sizing, disconnects.

use std::collections::BTreeMap;
use std::sync::Arc;

use memory_duel::core::{
    AwardReason, BoardError, Deck, Duel, DuelConfig, DuelEvent, DuelPlayer, NoopListener,
    RecordingListener, SelectionOutcome, SimpleRng,
};
use memory_duel::engine::{MemoryGame, SchedulerError, SessionScheduler};
use memory_duel::types::{Arena, BlockPos, DuelId, FinishReason, Parcel, ParcelId, Phase, PlayerId};

const A: PlayerId = PlayerId(1);
const B: PlayerId = PlayerId(2);

fn parcel() -> Parcel {
    Parcel::from_corners("arena", BlockPos::new(0, 64, 0), BlockPos::new(15, 70, 15))
}

fn config(grid: u8) -> DuelConfig {
    DuelConfig {
        grid_size: grid,
        memorize_ticks: 5,
        turn_time_ticks: 40,
        mismatch_reveal_ticks: 3,
        ..DuelConfig::default()
    }
}

fn deck(n: usize) -> Deck {
    let names = ["RED", "ORANGE", "YELLOW", "LIME", "GREEN", "CYAN", "BLUE", "PURPLE", "PINK", "WHITE"];
    Deck::new(&names[..n]).unwrap()
}

fn new_duel(config: DuelConfig, deck: &Deck, seed: u32) -> Duel {
    Duel::new(
        DuelId(1),
        ParcelId(0),
        &parcel(),
        [DuelPlayer::new(A), DuelPlayer::new(B)],
        Arc::new(config),
        deck,
        &mut SimpleRng::new(seed),
    )
    .unwrap()
}

fn until_playing(duel: &mut Duel) {
    while duel.phase() == Phase::Memorizing {
        duel.advance().unwrap();
    }
}

fn pairs_of(duel: &Duel) -> Vec<[BlockPos; 2]> {
    let mut by_pair: BTreeMap<u16, Vec<BlockPos>> = BTreeMap::new();
    for cell in duel.board().cells() {
        by_pair.entry(cell.pair_id).or_default().push(cell.pos);
    }
    by_pair.into_values().map(|v| [v[0], v[1]]).collect()
}

fn awards(events: &[DuelEvent]) -> Vec<(PlayerId, AwardReason, i64)> {
    events
        .iter()
        .filter_map(|e| match e {
            DuelEvent::Award(a) => Some((a.player, a.reason, a.points)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_player_clears_small_board_before_opponent_scores() {
    let cfg = config(2);
    let mut duel = new_duel(cfg.clone(), &deck(4), 7);
    until_playing(&mut duel);

    let pairs = pairs_of(&duel);
    assert_eq!(pairs.len(), 2);
    for [p, q] in &pairs {
        duel.handle_selection(A, *p).unwrap();
        duel.handle_selection(A, *q).unwrap();
    }

    assert_eq!(duel.phase(), Phase::Finished);
    assert_eq!(duel.winner(), Some(A));
    assert_eq!(duel.finish_reason(), Some(FinishReason::Completed));
    assert_eq!(duel.board().matched_count(), 4);

    let got = awards(&duel.take_events());
    let s = &cfg.scoring;
    assert!(got.contains(&(A, AwardReason::Victory, s.victory_points)));
    assert!(got.contains(&(B, AwardReason::Participation, s.participation_points)));
    assert!(!got.iter().any(|(p, r, _)| *p == B && *r == AwardReason::Victory));
    assert_eq!(
        duel.points(A),
        Some(2 * s.pair_points + s.first_pair_bonus + s.streak_bonus + s.victory_points)
    );
}

#[test]
fn test_timeout_with_equal_pairs_pays_both_the_tie_award() {
    let cfg = config(4);
    let mut duel = new_duel(cfg.clone(), &deck(8), 3);
    until_playing(&mut duel);
    let pairs = pairs_of(&duel);

    // A: one pair, then a miss that hands the turn to B.
    duel.handle_selection(A, pairs[0][0]).unwrap();
    duel.handle_selection(A, pairs[0][1]).unwrap();
    duel.handle_selection(A, pairs[1][0]).unwrap();
    assert_eq!(duel.handle_selection(A, pairs[2][0]), Ok(SelectionOutcome::Mismatched));
    while duel.turn_holder() == Some(A) {
        duel.advance().unwrap();
    }

    // B: one pair, then sits on the clock.
    duel.handle_selection(B, pairs[3][0]).unwrap();
    duel.handle_selection(B, pairs[3][1]).unwrap();
    duel.take_events();
    while duel.phase() == Phase::Playing {
        duel.advance().unwrap();
    }

    assert_eq!(duel.finish_reason(), Some(FinishReason::Timeout));
    assert_eq!(duel.winner(), None);
    assert_eq!(duel.time_left(B), Some(0));
    let got = awards(&duel.take_events());
    assert_eq!(
        got,
        vec![
            (A, AwardReason::TimeoutTie, cfg.scoring.timeout_tie_points),
            (B, AwardReason::TimeoutTie, cfg.scoring.timeout_tie_points),
        ]
    );
}

#[test]
fn test_timeout_leader_wins() {
    let mut duel = new_duel(config(4), &deck(8), 3);
    until_playing(&mut duel);
    let pairs = pairs_of(&duel);
    duel.handle_selection(A, pairs[0][0]).unwrap();
    duel.handle_selection(A, pairs[0][1]).unwrap();
    while duel.phase() == Phase::Playing {
        duel.advance().unwrap();
    }
    assert_eq!(duel.finish_reason(), Some(FinishReason::Timeout));
    assert_eq!(duel.winner(), Some(A));
}

#[test]
fn test_zero_timer_resolves_within_one_tick() {
    let mut duel = new_duel(config(2), &deck(2), 1);
    until_playing(&mut duel);
    while duel.time_left(A) > Some(1) {
        duel.advance().unwrap();
        assert_eq!(duel.phase(), Phase::Playing);
    }
    duel.advance().unwrap();
    assert_eq!(duel.time_left(A), Some(0));
    assert_eq!(duel.phase(), Phase::Finished);
}

#[test]
fn test_deck_of_exactly_enough_symbols() {
    let mut rng = SimpleRng::new(1);
    let ok = Duel::new(
        DuelId(1),
        ParcelId(0),
        &parcel(),
        [DuelPlayer::new(A), DuelPlayer::new(B)],
        Arc::new(config(2)),
        &deck(2),
        &mut rng,
    );
    assert!(ok.is_ok());

    let short = Duel::new(
        DuelId(2),
        ParcelId(0),
        &parcel(),
        [DuelPlayer::new(A), DuelPlayer::new(B)],
        Arc::new(config(2)),
        &deck(1),
        &mut rng,
    );
    assert_eq!(
        short.err(),
        Some(BoardError::InsufficientSymbols {
            required: 2,
            available: 1
        })
    );
}

#[test]
fn test_short_deck_binds_nothing() {
    let arena = Arena::new("a", vec![parcel()]);
    let mut s = SessionScheduler::new(config(2), Arc::new(deck(1)), &arena, 1).unwrap();
    let err = s.create_duel(DuelPlayer::new(A), DuelPlayer::new(B)).unwrap_err();
    assert!(matches!(err, SchedulerError::Board(BoardError::InsufficientSymbols { .. })));
    assert_eq!(s.free_parcels(), 1);
    assert_eq!(s.duel_of(A), None);
    assert!(!s.is_running());
}

#[test]
fn test_disconnect_mid_play_forfeits_and_frees_parcel() {
    let arena = Arena::new("a", vec![parcel()]);
    let mut s = SessionScheduler::new(config(2), Arc::new(deck(4)), &arena, 9).unwrap();
    let mut log = RecordingListener::new();

    let id = s.create_duel(DuelPlayer::new(A), DuelPlayer::new(B)).unwrap();
    while s.duel(id).map(|d| d.phase()) == Some(Phase::Memorizing) {
        s.tick(&mut log);
    }
    assert_eq!(s.free_parcels(), 0);

    assert_eq!(s.remove_player(A, &mut log), Some(id));

    let finished = log.events.iter().find_map(|(duel, e)| match e {
        DuelEvent::Finished { winner, reason } if *duel == id => Some((*winner, *reason)),
        _ => None,
    });
    assert_eq!(finished, Some((Some(B), FinishReason::Forfeit)));
    assert!(log
        .awards()
        .any(|a| a.player == B && a.reason == AwardReason::ForfeitWin));
    assert_eq!(log.points_for(A), 0);

    // Removed without waiting for the grace period; the parcel is free again.
    assert!(s.duel(id).is_none());
    assert_eq!(s.free_parcels(), 1);
    let next = s
        .create_duel(DuelPlayer::new(PlayerId(3)), DuelPlayer::new(PlayerId(4)))
        .unwrap();
    assert_eq!(s.duel(next).unwrap().parcel(), ParcelId(0));
}

#[test]
fn test_leaving_a_finished_duel_keeps_grace_period() {
    let arena = Arena::new("a", vec![parcel()]);
    let mut s = SessionScheduler::new(config(2), Arc::new(deck(2)), &arena, 2).unwrap();
    let mut log = RecordingListener::new();
    let id = s.create_duel(DuelPlayer::new(A), DuelPlayer::new(B)).unwrap();
    while s.duel(id).map(|d| d.phase()) == Some(Phase::Memorizing) {
        s.tick(&mut log);
    }
    let pairs = pairs_of(s.duel(id).unwrap());
    for [p, q] in pairs {
        s.select(A, p, &mut log).unwrap();
        s.select(A, q, &mut log).unwrap();
    }
    assert_eq!(s.duel(id).unwrap().phase(), Phase::Finished);

    assert_eq!(s.remove_player(B, &mut log), Some(id));
    assert!(s.duel(id).is_some());
    assert_eq!(s.duel_of(B), None);
    assert_eq!(s.duel_of(A), Some(id));
    assert!(s.registry().check_consistency().is_ok());
}

#[test]
fn test_extreme_tournament_standing_times_out_and_frees_parcel() {
    for comeback_enabled in [false, true] {
        let mut cfg = DuelConfig {
            grid_size: 2,
            memorize_ticks: 2,
            turn_time_ticks: 3,
            cleanup_delay_ticks: 2,
            ..DuelConfig::default()
        };
        cfg.scoring.comeback_enabled = comeback_enabled;
        let arena = Arena::new("a", vec![parcel()]);
        let mut game = MemoryGame::new(cfg, deck(2), &arena, 5).unwrap();
        game.join_lobby(DuelPlayer::with_points(A, i64::MAX), &mut NoopListener)
            .unwrap();
        game.join_lobby(DuelPlayer::with_points(B, 0), &mut NoopListener)
            .unwrap();
        let id = game.start_round().unwrap()[0];

        let mut log = RecordingListener::new();
        for _ in 0..20 {
            game.tick(&mut log);
        }
        let finished = log.events.iter().any(|(duel, e)| {
            *duel == id && matches!(e, DuelEvent::Finished { reason: FinishReason::Timeout, .. })
        });
        assert!(finished, "comeback_enabled={comeback_enabled}");
        assert!(game.scheduler().duel(id).is_none());
        assert_eq!(game.scheduler().free_parcels(), 1);
    }
}

#[test]
fn test_pair_matching_is_symmetric() {
    let mut base = new_duel(config(4), &deck(8), 21);
    until_playing(&mut base);
    let cells: Vec<BlockPos> = base.board().cells().iter().map(|c| c.pos).collect();

    for (i, &a) in cells.iter().enumerate() {
        for &b in &cells[i + 1..] {
            let mut forward = base.clone();
            let mut backward = base.clone();
            forward.handle_selection(A, a).unwrap();
            backward.handle_selection(A, b).unwrap();
            let f = forward.handle_selection(A, b).unwrap();
            let r = backward.handle_selection(A, a).unwrap();
            assert_eq!(f, r, "{a} / {b}");
        }
    }
}
