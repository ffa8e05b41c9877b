//! Deck module - the validated symbol palette boards are drawn from
//!
//! Loaded once at startup and shared read-only (behind an `Arc`) by every
//! duel. Construction fails if fewer than [`MIN_DECK_SIZE`] usable symbols
//! survive validation, which keeps the module from starting duels at all.

use std::collections::HashSet;

use tracing::warn;

use crate::error::{BoardError, DeckError};
use crate::rng::SimpleRng;
use crate::types::{Symbol, MIN_DECK_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    symbols: Vec<Symbol>,
}

impl Deck {
    /// Validate raw palette entries.
    ///
    /// Invalid and duplicate entries are dropped (and logged); the rest keep
    /// their original order.
    pub fn new<I, S>(entries: I) -> Result<Self, DeckError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        let mut total = 0usize;

        for raw in entries {
            total += 1;
            let raw = raw.as_ref();
            let Some(symbol) = Symbol::parse(raw) else {
                warn!(entry = raw, "dropping invalid deck entry");
                continue;
            };
            if !seen.insert(symbol.clone()) {
                warn!(entry = raw, "dropping duplicate deck entry");
                continue;
            }
            symbols.push(symbol);
        }

        if total == 0 {
            return Err(DeckError::Empty);
        }
        if symbols.len() < MIN_DECK_SIZE {
            return Err(DeckError::TooSmall {
                valid: symbols.len(),
                minimum: MIN_DECK_SIZE,
            });
        }

        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Whether the deck can supply `pairs` unique symbols.
    pub fn can_supply(&self, pairs: usize) -> bool {
        pairs <= self.symbols.len()
    }

    /// Draw `pairs` distinct symbols in random order, without replacement.
    pub fn draw(&self, pairs: usize, rng: &mut SimpleRng) -> Result<Vec<Symbol>, BoardError> {
        if !self.can_supply(pairs) {
            return Err(BoardError::InsufficientSymbols {
                required: pairs,
                available: self.symbols.len(),
            });
        }

        let mut pool = self.symbols.clone();
        rng.shuffle(&mut pool);
        pool.truncate(pairs);
        Ok(pool)
    }
}
