//! Parcel allocation
//!
//! Every parcel of the arena is either free or bound to exactly one duel.
//! The scheduler is the only writer, so check-and-set is a plain slot scan.

use tracing::{debug, warn};

use crate::error::AllocError;
use crate::types::{Arena, DuelId, Parcel, ParcelId};

#[derive(Debug, Clone)]
pub struct ResourceAllocator {
    parcels: Vec<Parcel>,
    bindings: Vec<Option<DuelId>>,
}

impl ResourceAllocator {
    pub fn new(parcels: Vec<Parcel>) -> Self {
        let bindings = vec![None; parcels.len()];
        Self { parcels, bindings }
    }

    pub fn from_arena(arena: &Arena) -> Self {
        Self::new(arena.parcels.clone())
    }

    /// Bind the first free parcel to `duel`.
    pub fn allocate(&mut self, duel: DuelId) -> Result<ParcelId, AllocError> {
        if let Some(parcel) = self.parcel_of(duel) {
            return Err(AllocError::AlreadyBound { duel, parcel });
        }
        let Some(index) = self.bindings.iter().position(Option::is_none) else {
            warn!(%duel, total = self.parcels.len(), "no free parcel");
            return Err(AllocError::Exhausted {
                total: self.parcels.len(),
            });
        };
        self.bindings[index] = Some(duel);
        debug!(%duel, parcel = index, "parcel bound");
        Ok(ParcelId(index))
    }

    /// Free a parcel. Releasing an already-free or unknown parcel is a no-op.
    pub fn release(&mut self, parcel: ParcelId) -> Option<DuelId> {
        let previous = self.bindings.get_mut(parcel.0).and_then(Option::take);
        if let Some(duel) = previous {
            debug!(%duel, %parcel, "parcel released");
        }
        previous
    }

    pub fn bound_to(&self, parcel: ParcelId) -> Option<DuelId> {
        self.bindings.get(parcel.0).copied().flatten()
    }

    pub fn parcel_of(&self, duel: DuelId) -> Option<ParcelId> {
        self.bindings
            .iter()
            .position(|b| *b == Some(duel))
            .map(ParcelId)
    }

    pub fn parcel(&self, id: ParcelId) -> Option<&Parcel> {
        self.parcels.get(id.0)
    }

    pub fn total(&self) -> usize {
        self.parcels.len()
    }

    pub fn free_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_none()).count()
    }
}
