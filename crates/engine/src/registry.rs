//! Session registry - duels by id and by player
//!
//! Duels are kept in a `BTreeMap` so iteration follows registration order
//! (ids are handed out monotonically). The player index must always point at
//! a duel that contains the player; [`SessionRegistry::check_consistency`]
//! verifies that.

use std::collections::{BTreeMap, HashMap};

use memory_duel_core::Duel;

use crate::error::RegistryError;
use crate::types::{DuelId, PlayerId};

#[derive(Debug, Clone)]
pub struct DuelEntry {
    pub duel: Duel,
    /// Scheduler tick at which a finished duel gets torn down.
    pub cleanup_at: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    duels: BTreeMap<DuelId, DuelEntry>,
    by_player: HashMap<PlayerId, DuelId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a duel and both player mappings, or nothing at all.
    pub fn insert(&mut self, duel: Duel) -> Result<(), RegistryError> {
        let id = duel.id();
        let [a, b] = duel.players();
        if a == b {
            return Err(RegistryError::SamePlayer(a));
        }
        if self.duels.contains_key(&id) {
            return Err(RegistryError::DuplicateDuel(id));
        }
        for player in [a, b] {
            if let Some(&busy) = self.by_player.get(&player) {
                return Err(RegistryError::PlayerBusy { player, duel: busy });
            }
        }

        self.by_player.insert(a, id);
        self.by_player.insert(b, id);
        self.duels.insert(
            id,
            DuelEntry {
                duel,
                cleanup_at: None,
            },
        );
        Ok(())
    }

    /// Remove a duel and whatever player mappings still point at it.
    pub fn remove(&mut self, id: DuelId) -> Option<DuelEntry> {
        let entry = self.duels.remove(&id)?;
        for player in entry.duel.players() {
            if self.by_player.get(&player) == Some(&id) {
                self.by_player.remove(&player);
            }
        }
        Some(entry)
    }

    /// Drop a player's mapping but keep the duel.
    pub fn unmap_player(&mut self, player: PlayerId) -> Option<DuelId> {
        self.by_player.remove(&player)
    }

    pub fn duel_of(&self, player: PlayerId) -> Option<DuelId> {
        self.by_player.get(&player).copied()
    }

    pub fn get(&self, id: DuelId) -> Option<&DuelEntry> {
        self.duels.get(&id)
    }

    pub fn get_mut(&mut self, id: DuelId) -> Option<&mut DuelEntry> {
        self.duels.get_mut(&id)
    }

    /// Duel ids in registration order.
    pub fn ids(&self) -> Vec<DuelId> {
        self.duels.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DuelId, &DuelEntry)> {
        self.duels.iter()
    }

    pub fn len(&self) -> usize {
        self.duels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duels.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.by_player.len()
    }

    pub fn check_consistency(&self) -> Result<(), RegistryError> {
        for (&player, &duel) in &self.by_player {
            let ok = self
                .duels
                .get(&duel)
                .is_some_and(|entry| entry.duel.has_player(player));
            if !ok {
                return Err(RegistryError::Dangling { player, duel });
            }
        }
        Ok(())
    }
}
