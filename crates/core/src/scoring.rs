//! Scoring module - point awards for duel events
//!
//! Stateless: every function maps an event plus the configured constants to
//! the points it is worth. The duel decides *when* an event happened; this
//! module only decides *how much*.
//!
//! - Every pair found earns `pair_points`.
//! - The first pair of the whole duel earns `first_pair_bonus` on top.
//! - From the second consecutive pair of a streak onward, `streak_bonus` is added.
//! - A completed board pays `victory_points` to the player with more pairs and
//!   `participation_points` to the other; a tie pays participation to both.
//! - A timeout with a clear leader pays victory/participation; a timeout tie
//!   pays `timeout_tie_points` to both.
//! - A forfeit pays the remaining player `victory_points`.
//! - Optional comeback bonus (see [`comeback_award`]).

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::types::PlayerId;

/// Why points were awarded. The string form is the ledger reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardReason {
    PairFound,
    FirstPair,
    Streak,
    Victory,
    Participation,
    TimeoutTie,
    ForfeitWin,
    Comeback,
}

impl AwardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AwardReason::PairFound => "pair_found",
            AwardReason::FirstPair => "first_pair",
            AwardReason::Streak => "streak",
            AwardReason::Victory => "victory",
            AwardReason::Participation => "participation",
            AwardReason::TimeoutTie => "timeout_tie",
            AwardReason::ForfeitWin => "forfeit_win",
            AwardReason::Comeback => "comeback",
        }
    }
}

/// Points granted to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Award {
    pub player: PlayerId,
    pub points: i64,
    pub reason: AwardReason,
}

impl Award {
    pub fn new(player: PlayerId, points: i64, reason: AwardReason) -> Self {
        Self {
            player,
            points,
            reason,
        }
    }
}

/// Score breakdown for one found pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairScore {
    pub base: i64,
    pub first_pair_bonus: i64,
    pub streak_bonus: i64,
    pub total: i64,
}

/// Calculate the award for a found pair.
///
/// `streak` is the finder's streak *including* this pair (1 for the first
/// pair of a streak).
pub fn calculate_pair_score(config: &ScoringConfig, streak: u32, first_of_duel: bool) -> PairScore {
    let base = config.pair_points;
    let first_pair_bonus = if first_of_duel {
        config.first_pair_bonus
    } else {
        0
    };
    let streak_bonus = if streak >= 2 { config.streak_bonus } else { 0 };

    PairScore {
        base,
        first_pair_bonus,
        streak_bonus,
        total: base.saturating_add(first_pair_bonus).saturating_add(streak_bonus),
    }
}

/// Expand a pair score into ledger awards (one per non-zero component).
pub fn pair_awards(player: PlayerId, score: &PairScore) -> Vec<Award> {
    [
        (score.base, AwardReason::PairFound),
        (score.first_pair_bonus, AwardReason::FirstPair),
        (score.streak_bonus, AwardReason::Streak),
    ]
    .into_iter()
    .filter(|(points, _)| *points != 0)
    .map(|(points, reason)| Award::new(player, points, reason))
    .collect()
}

/// Final outcome of a duel: who won (if anyone) and the closing awards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub winner: Option<PlayerId>,
    pub awards: Vec<Award>,
}

fn leader(players: [PlayerId; 2], pairs: [u32; 2]) -> Option<(PlayerId, PlayerId)> {
    if pairs[0] > pairs[1] {
        Some((players[0], players[1]))
    } else if pairs[1] > pairs[0] {
        Some((players[1], players[0]))
    } else {
        None
    }
}

/// Settle a fully matched board.
pub fn settle_completion(config: &ScoringConfig, players: [PlayerId; 2], pairs: [u32; 2]) -> Settlement {
    match leader(players, pairs) {
        Some((winner, loser)) => Settlement {
            winner: Some(winner),
            awards: vec![
                Award::new(winner, config.victory_points, AwardReason::Victory),
                Award::new(loser, config.participation_points, AwardReason::Participation),
            ],
        },
        None => Settlement {
            winner: None,
            awards: players
                .iter()
                .map(|&p| Award::new(p, config.participation_points, AwardReason::Participation))
                .collect(),
        },
    }
}

/// Settle a duel whose turn holder ran out of time.
pub fn settle_timeout(config: &ScoringConfig, players: [PlayerId; 2], pairs: [u32; 2]) -> Settlement {
    match leader(players, pairs) {
        Some((winner, loser)) => Settlement {
            winner: Some(winner),
            awards: vec![
                Award::new(winner, config.victory_points, AwardReason::Victory),
                Award::new(loser, config.participation_points, AwardReason::Participation),
            ],
        },
        None => Settlement {
            winner: None,
            awards: players
                .iter()
                .map(|&p| Award::new(p, config.timeout_tie_points, AwardReason::TimeoutTie))
                .collect(),
        },
    }
}

/// Settle a duel abandoned by one player. The leaver earns nothing.
pub fn settle_forfeit(config: &ScoringConfig, winner: PlayerId) -> Settlement {
    Settlement {
        winner: Some(winner),
        awards: vec![Award::new(winner, config.victory_points, AwardReason::ForfeitWin)],
    }
}

/// Comeback bonus for a winner who at some point trailed by `comeback_margin`
/// or more.
///
/// `max_deficit` is measured in accumulated tournament points (external
/// standing plus points earned in this duel), not pairs on the board, so it
/// does not necessarily reflect a reversal within the duel itself. The rule
/// only applies when `comeback_enabled` is set.
pub fn comeback_award(config: &ScoringConfig, winner: PlayerId, max_deficit: i64) -> Option<Award> {
    if !config.comeback_enabled || max_deficit < config.comeback_margin {
        return None;
    }
    Some(Award::new(winner, config.comeback_bonus, AwardReason::Comeback))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);

    #[test]
    fn test_plain_pair() {
        let cfg = ScoringConfig::default();
        let score = calculate_pair_score(&cfg, 1, false);
        assert_eq!(score.total, cfg.pair_points);
        assert_eq!(pair_awards(A, &score).len(), 1);
    }

    #[test]
    fn test_first_pair_bonus() {
        let cfg = ScoringConfig::default();
        let score = calculate_pair_score(&cfg, 1, true);
        assert_eq!(score.first_pair_bonus, cfg.first_pair_bonus);
        assert_eq!(score.total, cfg.pair_points + cfg.first_pair_bonus);
        let reasons: Vec<_> = pair_awards(A, &score).iter().map(|a| a.reason).collect();
        assert_eq!(reasons, vec![AwardReason::PairFound, AwardReason::FirstPair]);
    }

    #[test]
    fn test_streak_bonus_from_second_pair() {
        let cfg = ScoringConfig::default();
        assert_eq!(calculate_pair_score(&cfg, 1, false).streak_bonus, 0);
        assert_eq!(calculate_pair_score(&cfg, 2, false).streak_bonus, cfg.streak_bonus);
        assert_eq!(calculate_pair_score(&cfg, 5, false).streak_bonus, cfg.streak_bonus);
    }

    #[test]
    fn test_completion_with_leader() {
        let cfg = ScoringConfig::default();
        let s = settle_completion(&cfg, [A, B], [2, 0]);
        assert_eq!(s.winner, Some(A));
        assert_eq!(
            s.awards,
            vec![
                Award::new(A, cfg.victory_points, AwardReason::Victory),
                Award::new(B, cfg.participation_points, AwardReason::Participation),
            ]
        );
        assert_eq!(settle_completion(&cfg, [A, B], [1, 3]).winner, Some(B));
    }

    #[test]
    fn test_completion_tie_pays_participation() {
        let cfg = ScoringConfig::default();
        let s = settle_completion(&cfg, [A, B], [4, 4]);
        assert_eq!(s.winner, None);
        assert!(s
            .awards
            .iter()
            .all(|a| a.reason == AwardReason::Participation && a.points == cfg.participation_points));
    }

    #[test]
    fn test_timeout_tie_uses_distinct_constant() {
        let cfg = ScoringConfig::default();
        let s = settle_timeout(&cfg, [A, B], [1, 1]);
        assert_eq!(s.winner, None);
        assert_eq!(s.awards.len(), 2);
        assert!(s
            .awards
            .iter()
            .all(|a| a.reason == AwardReason::TimeoutTie && a.points == cfg.timeout_tie_points));
    }

    #[test]
    fn test_timeout_with_leader() {
        let cfg = ScoringConfig::default();
        let s = settle_timeout(&cfg, [A, B], [0, 1]);
        assert_eq!(s.winner, Some(B));
        assert_eq!(s.awards[0], Award::new(B, cfg.victory_points, AwardReason::Victory));
    }

    #[test]
    fn test_forfeit() {
        let cfg = ScoringConfig::default();
        let s = settle_forfeit(&cfg, B);
        assert_eq!(s.winner, Some(B));
        assert_eq!(s.awards, vec![Award::new(B, cfg.victory_points, AwardReason::ForfeitWin)]);
    }

    #[test]
    fn test_comeback_requires_toggle_and_margin() {
        let mut cfg = ScoringConfig::default();
        assert_eq!(comeback_award(&cfg, A, 1_000), None);

        cfg.comeback_enabled = true;
        assert_eq!(comeback_award(&cfg, A, cfg.comeback_margin - 1), None);
        assert_eq!(
            comeback_award(&cfg, A, cfg.comeback_margin),
            Some(Award::new(A, cfg.comeback_bonus, AwardReason::Comeback))
        );
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(AwardReason::TimeoutTie.as_str(), "timeout_tie");
        assert_eq!(AwardReason::ForfeitWin.as_str(), "forfeit_win");
    }
}
