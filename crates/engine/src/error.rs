//! Error types for session bookkeeping.

use memory_duel_core::{BoardError, ConfigError};
use thiserror::Error;

use crate::types::{DuelId, ParcelId, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("no free parcel ({total} in the arena)")]
    Exhausted { total: usize },
    #[error("{duel} already holds {parcel}")]
    AlreadyBound { duel: DuelId, parcel: ParcelId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{player} is already in {duel}")]
    PlayerBusy { player: PlayerId, duel: DuelId },
    #[error("{0} cannot duel themselves")]
    SamePlayer(PlayerId),
    #[error("{0} is already registered")]
    DuplicateDuel(DuelId),
    #[error("{player} maps to {duel}, which does not contain them")]
    Dangling { player: PlayerId, duel: DuelId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("invalid duel configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("board generation failed: {0}")]
    Board(#[from] BoardError),
    #[error("{parcel} is not bound to {duel}")]
    ParcelNotBound { duel: DuelId, parcel: ParcelId },
    #[error("{needed} duels need {needed} parcels, only {free} free")]
    NoFreeParcels { needed: usize, free: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("nobody is waiting")]
    Empty,
    #[error("{waiting} players are waiting; an odd count leaves one player without an opponent")]
    OddCount { waiting: usize },
    #[error("{needed} duels needed but only {free} parcels are free")]
    NotEnoughParcels { needed: usize, free: usize },
    #[error("{0} is already waiting")]
    AlreadyQueued(PlayerId),
    #[error("{0} is already in a duel")]
    AlreadyInDuel(PlayerId),
    #[error("round aborted: {0}")]
    Creation(#[from] SchedulerError),
}
