//! Lobby rounds through the module facade.

use std::collections::HashSet;

use memory_duel::core::{Deck, DuelConfig, DuelListener, DuelPlayer, NoopListener};
use memory_duel::engine::{InboundEvent, LobbyError, MemoryGame, SessionListener};
use memory_duel::types::{Arena, BlockPos, Parcel, ParcelId, Phase, PlayerId};

fn arena(parcels: i32) -> Arena {
    Arena::new(
        "lobby-test",
        (0..parcels)
            .map(|i| {
                Parcel::from_corners("w", BlockPos::new(i * 16, 64, 0), BlockPos::new(i * 16 + 9, 70, 9))
            })
            .collect(),
    )
}

fn game(parcels: i32) -> MemoryGame {
    let config = DuelConfig {
        grid_size: 2,
        memorize_ticks: 2,
        lobby_feedback_ticks: 2,
        ..DuelConfig::default()
    };
    MemoryGame::new(config, Deck::new(["A", "B", "C"]).unwrap(), &arena(parcels), 77).unwrap()
}

fn join(game: &mut MemoryGame, ids: impl IntoIterator<Item = u64>) {
    for id in ids {
        game.join_lobby(DuelPlayer::new(PlayerId(id)), &mut NoopListener)
            .unwrap();
    }
}

#[derive(Default)]
struct Feedback {
    messages: Vec<(PlayerId, String)>,
    status: Vec<(PlayerId, usize)>,
}

impl DuelListener for Feedback {}

impl SessionListener for Feedback {
    fn on_feedback(&mut self, player: PlayerId, message: &str) {
        self.messages.push((player, message.to_string()));
    }

    fn on_lobby_status(&mut self, player: PlayerId, waiting: usize) {
        self.status.push((player, waiting));
    }
}

#[test]
fn odd_lobby_never_creates_duels() {
    let mut g = game(4);
    join(&mut g, 1..=5);
    let before: Vec<PlayerId> = g.lobby().waiting().collect();

    let err = g.start_round().unwrap_err();
    assert_eq!(err, LobbyError::OddCount { waiting: 5 });
    assert!(err.to_string().contains("odd"));

    assert_eq!(g.lobby().waiting().collect::<Vec<_>>(), before);
    assert_eq!(g.scheduler().active_count(), 0);
    assert_eq!(g.scheduler().free_parcels(), 4);
}

#[test]
fn round_needs_enough_parcels() {
    let mut g = game(1);
    join(&mut g, 1..=4);
    assert_eq!(
        g.start_round(),
        Err(LobbyError::NotEnoughParcels { needed: 2, free: 1 })
    );
    assert_eq!(g.lobby().waiting_count(), 4);
}

#[test]
fn round_pairs_everyone_onto_distinct_parcels() {
    let mut g = game(3);
    join(&mut g, 1..=6);
    let duels = g.start_round().unwrap();
    assert_eq!(duels.len(), 3);
    assert_eq!(g.lobby().waiting_count(), 0);

    let mut parcels = HashSet::new();
    let mut players = HashSet::new();
    for id in &duels {
        let duel = g.scheduler().duel(*id).unwrap();
        assert!(parcels.insert(duel.parcel()));
        for p in duel.players() {
            assert!(players.insert(p));
        }
    }
    assert_eq!(parcels, (0..3).map(ParcelId).collect());
    assert_eq!(players.len(), 6);
    assert!(g.scheduler().registry().check_consistency().is_ok());

    g.tick(&mut NoopListener);
    g.tick(&mut NoopListener);
    for id in &duels {
        assert_eq!(g.scheduler().duel(*id).unwrap().phase(), Phase::Playing);
    }
}

#[test]
fn players_in_duels_cannot_rejoin() {
    let mut g = game(2);
    join(&mut g, [1, 2]);
    g.start_round().unwrap();

    let mut fb = Feedback::default();
    assert_eq!(
        g.join_lobby(DuelPlayer::new(PlayerId(1)), &mut fb),
        Err(LobbyError::AlreadyInDuel(PlayerId(1)))
    );
    assert_eq!(fb.messages.len(), 1);
}

#[test]
fn waiting_players_get_periodic_counts() {
    let mut g = game(1);
    let mut fb = Feedback::default();
    for id in [1, 2, 3] {
        g.handle(
            InboundEvent::JoinLobby {
                player: PlayerId(id),
                tournament_points: 0,
            },
            &mut fb,
        )
        .unwrap();
    }
    // One immediate status per join.
    assert_eq!(fb.status.len(), 3);

    g.tick(&mut fb);
    g.tick(&mut fb);
    let periodic = &fb.status[3..];
    assert_eq!(periodic.len(), 3);
    assert!(periodic.iter().all(|(_, n)| *n == 3));
}

#[test]
fn leaving_the_lobby_fixes_an_odd_count() {
    let mut g = game(2);
    join(&mut g, 1..=3);
    g.handle(InboundEvent::Leave { player: PlayerId(2) }, &mut NoopListener)
        .unwrap();
    let duels = g.start_round().unwrap();
    assert_eq!(duels.len(), 1);
    assert_eq!(g.scheduler().duel_of(PlayerId(2)), None);
}
