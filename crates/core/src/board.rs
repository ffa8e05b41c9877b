//! Board module - the n×n grid of paired symbols a duel is played on
//!
//! [`generate_board`] is the board generator: a pure function of the parcel,
//! the grid size, the deck and an RNG. The grid is laid out on the parcel's
//! floor (`min.y`), centered on the parcel's horizontal center, so any pair of
//! opposite corners yields the same layout.

use serde::{Deserialize, Serialize};

use crate::deck::Deck;
use crate::error::BoardError;
use crate::rng::SimpleRng;
use crate::types::{BlockPos, Parcel, Symbol};

/// One board position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub pos: BlockPos,
    pub symbol: Symbol,
    /// Both cells of a pair share this id.
    pub pair_id: u16,
    pub revealed: bool,
    pub matched: bool,
}

/// Square grid of cells, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u8,
    origin: BlockPos,
    cells: Vec<Cell>,
}

/// Number of pairs an `n×n` board needs.
pub fn pairs_for(grid_size: u8) -> usize {
    let n = grid_size as usize;
    n * n / 2
}

/// Top-left corner of the grid, or `None` if any cell would overflow i32.
fn board_origin(parcel: &Parcel, grid_size: u8) -> Option<BlockPos> {
    let half = i32::from(grid_size) / 2;
    let last = i32::from(grid_size) - 1;
    let x = parcel.center_x().checked_sub(half)?;
    let z = parcel.center_z().checked_sub(half)?;
    x.checked_add(last)?;
    z.checked_add(last)?;
    Some(BlockPos::new(x, parcel.min.y, z))
}

/// Lay out a fresh board inside `parcel`.
///
/// Draws `n²/2` symbols from the deck, duplicates each into a pair, shuffles
/// the `n²` sequence and places it row by row. Fails before touching anything
/// if the grid size is unusable or the deck is too small.
pub fn generate_board(
    parcel: &Parcel,
    grid_size: u8,
    deck: &Deck,
    rng: &mut SimpleRng,
) -> Result<Board, BoardError> {
    if grid_size < 2 || grid_size % 2 != 0 {
        return Err(BoardError::InvalidGridSize(grid_size));
    }

    let origin = board_origin(parcel, grid_size).ok_or(BoardError::OutOfRange { grid_size })?;
    let pairs = pairs_for(grid_size);
    let symbols = deck.draw(pairs, rng)?;

    let mut sequence: Vec<(u16, Symbol)> = Vec::with_capacity(pairs * 2);
    for (pair_id, symbol) in symbols.into_iter().enumerate() {
        sequence.push((pair_id as u16, symbol.clone()));
        sequence.push((pair_id as u16, symbol));
    }
    rng.shuffle(&mut sequence);

    let cells = sequence
        .into_iter()
        .enumerate()
        .map(|(i, (pair_id, symbol))| {
            let row = (i / grid_size as usize) as i32;
            let col = (i % grid_size as usize) as i32;
            Cell {
                pos: BlockPos::new(origin.x + col, origin.y, origin.z + row),
                symbol,
                pair_id,
                revealed: false,
                matched: false,
            }
        })
        .collect();

    Ok(Board {
        size: grid_size,
        origin,
        cells,
    })
}

impl Board {
    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Resolve a world position to a cell index.
    pub fn index_of(&self, pos: BlockPos) -> Option<usize> {
        if self.cells.is_empty() || pos.y != self.origin.y {
            return None;
        }
        let col = pos.x.checked_sub(self.origin.x)?;
        let row = pos.z.checked_sub(self.origin.z)?;
        let n = self.size as i32;
        if !(0..n).contains(&col) || !(0..n).contains(&row) {
            return None;
        }
        Some((row * n + col) as usize)
    }

    pub fn reveal(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.revealed = true;
        }
    }

    pub fn hide(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            if !cell.matched {
                cell.revealed = false;
            }
        }
    }

    pub fn mark_matched(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.revealed = true;
            cell.matched = true;
        }
    }

    /// Show every cell face-up (memorization phase).
    pub fn reveal_all(&mut self) {
        for cell in &mut self.cells {
            cell.revealed = true;
        }
    }

    /// Turn every unmatched cell face-down.
    pub fn hide_unmatched(&mut self) {
        for cell in &mut self.cells {
            if !cell.matched {
                cell.revealed = false;
            }
        }
    }

    /// Whether two cells hold the same symbol.
    pub fn same_symbol(&self, a: usize, b: usize) -> bool {
        match (self.cells.get(a), self.cells.get(b)) {
            (Some(a), Some(b)) => a.pair_id == b.pair_id,
            _ => false,
        }
    }

    pub fn matched_count(&self) -> usize {
        self.cells.iter().filter(|c| c.matched).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| c.matched)
    }

    /// Tear the board down at the end of a duel.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
