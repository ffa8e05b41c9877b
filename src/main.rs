//! Headless demo runner (default binary).
//!
//! Spawns the adapter, queues four bots in the lobby, starts a round and lets
//! the bots play from the broadcast snapshots until every duel is torn down.
//! Bots have leaky memory: they remember roughly two of every three cells
//! they see face-up.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memory_duel::adapter::{self, OutboundMessage, RuntimeConfig};
use memory_duel::core::{Deck, DuelConfig, DuelSnapshot, SimpleRng};
use memory_duel::engine::MemoryGame;
use memory_duel::types::{Arena, BlockPos, Parcel, Phase, PlayerId, Symbol};

const PALETTE: [&str; 12] = [
    "STONE", "DIRT", "OAK_LOG", "SAND", "GLASS", "COAL_ORE", "IRON_BLOCK", "GOLD_BLOCK",
    "DIAMOND_BLOCK", "REDSTONE_BLOCK", "EMERALD_BLOCK", "PUMPKIN",
];

const BOTS: u64 = 4;

struct Bot {
    memory: HashMap<BlockPos, Symbol>,
    rng: SimpleRng,
}

impl Bot {
    fn new(seed: u32) -> Self {
        Self {
            memory: HashMap::new(),
            rng: SimpleRng::new(seed),
        }
    }

    fn observe(&mut self, snapshot: &DuelSnapshot) {
        for cell in &snapshot.cells {
            if cell.matched {
                self.memory.remove(&cell.pos);
                continue;
            }
            if let Some(symbol) = &cell.symbol {
                if self.rng.next_range(3) != 0 {
                    self.memory.insert(cell.pos, symbol.clone());
                }
            }
        }
    }

    fn random_hidden(&mut self, snapshot: &DuelSnapshot) -> Option<BlockPos> {
        let hidden: Vec<BlockPos> = snapshot
            .cells
            .iter()
            .filter(|c| c.symbol.is_none())
            .map(|c| c.pos)
            .collect();
        if hidden.is_empty() {
            return None;
        }
        let i = self.rng.next_range(hidden.len() as u32) as usize;
        Some(hidden[i])
    }

    fn choose(&mut self, snapshot: &DuelSnapshot) -> Option<BlockPos> {
        let face_up: Vec<_> = snapshot
            .cells
            .iter()
            .filter(|c| !c.matched && c.symbol.is_some())
            .collect();

        match face_up.as_slice() {
            [] => {
                let mut seen: HashMap<&Symbol, BlockPos> = HashMap::new();
                for (pos, symbol) in &self.memory {
                    if let Some(other) = seen.insert(symbol, *pos) {
                        return Some(other);
                    }
                }
                self.random_hidden(snapshot)
            }
            [first] => {
                let partner = self
                    .memory
                    .iter()
                    .find(|(pos, symbol)| **pos != first.pos && first.symbol.as_ref() == Some(*symbol))
                    .map(|(pos, _)| *pos);
                partner.or_else(|| self.random_hidden(snapshot))
            }
            _ => None,
        }
    }
}

fn demo_arena() -> Arena {
    let parcels = (0..2)
        .map(|i| {
            Parcel::from_corners(
                "world",
                BlockPos::new(i * 32, 64, 0),
                BlockPos::new(i * 32 + 15, 72, 15),
            )
        })
        .collect();
    Arena::new("demo", parcels)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DuelConfig::from_env().context("invalid duel configuration")?;
    let deck = Deck::new(PALETTE).context("invalid deck")?;
    let game = MemoryGame::new(config, deck, &demo_arena(), 2024)?;

    let handle = adapter::spawn(game, RuntimeConfig::from_env());
    let mut rx = handle.subscribe();

    let mut bots: BTreeMap<PlayerId, Bot> = (1..=BOTS)
        .map(|id| (PlayerId(id), Bot::new(id as u32 * 7919)))
        .collect();
    for &id in bots.keys() {
        handle.join_lobby(id, 0).await?;
    }

    let duels = handle.start_round().await??;
    info!(duels = duels.len(), "round started");

    let mut remaining = duels.len();
    let mut totals: BTreeMap<PlayerId, i64> = BTreeMap::new();
    while remaining > 0 {
        let msg = match rx.recv().await {
            Ok(msg) => msg,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "demo fell behind the broadcast");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match msg {
            OutboundMessage::DuelState { snapshot } => {
                for player in &snapshot.players {
                    if let Some(bot) = bots.get_mut(&player.id) {
                        bot.observe(&snapshot);
                    }
                }
                if snapshot.phase != Phase::Playing || !snapshot.accepting_input {
                    continue;
                }
                let Some(holder) = snapshot.turn_holder else {
                    continue;
                };
                let choice = bots.get_mut(&holder).and_then(|bot| bot.choose(&snapshot));
                if let Some(pos) = choice {
                    handle.select_cell(holder, pos).await?;
                }
            }
            OutboundMessage::Score(score) => {
                *totals.entry(score.player).or_default() += score.delta;
            }
            OutboundMessage::DuelRemoved { duel, .. } => {
                info!(%duel, "duel over");
                remaining -= 1;
            }
            _ => {}
        }
    }

    handle.shutdown().await?;

    println!("Final ledger totals:");
    for (player, points) in &totals {
        println!("  {player}: {points}");
    }
    Ok(())
}
