//! Adapter runtime integration.
//!
//! Bridges the synchronous [`MemoryGame`] with async callers. One task owns
//! the game; everything else talks to it through a bounded command queue and
//! listens on a broadcast channel.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use memory_duel_engine::{InboundEvent, LobbyError, MemoryGame};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::ledger::spawn_ledger;
use crate::protocol::{ChannelListener, OutboundMessage};
use crate::types::{BlockPos, DuelId, PlayerId, TICK_MS};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub tick_ms: u64,
    pub max_pending: usize,
    pub outbound_capacity: usize,
    pub ledger_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            max_pending: 256,
            outbound_capacity: 1024,
            ledger_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Create from `MEMORY_DUEL_TICK_MS`, `MEMORY_DUEL_MAX_PENDING` and
    /// `MEMORY_DUEL_LEDGER_PATH`.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let tick_ms = env::var("MEMORY_DUEL_TICK_MS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.tick_ms);

        let max_pending = env::var("MEMORY_DUEL_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending);

        let ledger_path = env::var("MEMORY_DUEL_LEDGER_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(PathBuf::from(s)) });

        Self {
            tick_ms,
            max_pending,
            ledger_path,
            ..defaults
        }
    }
}

/// Command delivered to the game task.
#[derive(Debug)]
enum Command {
    Event(InboundEvent),
    StartRound(oneshot::Sender<Result<Vec<DuelId>, LobbyError>>),
    Shutdown,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Handle to a running game task.
#[derive(Debug)]
pub struct AdapterHandle {
    cmd_tx: mpsc::Sender<Command>,
    out_tx: broadcast::Sender<OutboundMessage>,
    task: JoinHandle<MemoryGame>,
    ledger: Option<JoinHandle<()>>,
}

/// Start the game task on the current tokio runtime.
pub fn spawn(game: MemoryGame, config: RuntimeConfig) -> AdapterHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(config.max_pending.max(1));
    let (out_tx, _) = broadcast::channel::<OutboundMessage>(config.outbound_capacity.max(1));

    let (ledger_tx, ledger) = match config.ledger_path.clone() {
        Some(path) => {
            info!(path = %path.display(), "ledger enabled");
            let (tx, handle) = spawn_ledger(path);
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    let listener = ChannelListener::new(out_tx.clone(), ledger_tx);
    let period = Duration::from_millis(config.tick_ms.max(1));
    let task = tokio::spawn(run(game, cmd_rx, listener, period));

    AdapterHandle {
        cmd_tx,
        out_tx,
        task,
        ledger,
    }
}

fn apply(game: &mut MemoryGame, cmd: Command, listener: &mut ChannelListener) -> Flow {
    match cmd {
        Command::Event(event) => {
            if let Err(e) = game.handle(event, listener) {
                warn!(error = %e, "inbound event failed");
            }
            Flow::Continue
        }
        Command::StartRound(reply) => {
            let _ = reply.send(game.start_round());
            Flow::Continue
        }
        Command::Shutdown => Flow::Stop,
    }
}

async fn run(
    mut game: MemoryGame,
    mut cmd_rx: mpsc::Receiver<Command>,
    mut listener: ChannelListener,
    period: Duration,
) -> MemoryGame {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    'outer: loop {
        if !game.is_active() {
            // Nothing to tick: sleep until somebody sends something.
            let Some(cmd) = cmd_rx.recv().await else {
                break;
            };
            if apply(&mut game, cmd, &mut listener) == Flow::Stop {
                break;
            }
            interval.reset();
            continue;
        }

        interval.tick().await;
        loop {
            match cmd_rx.try_recv() {
                Ok(cmd) => {
                    if apply(&mut game, cmd, &mut listener) == Flow::Stop {
                        break 'outer;
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => break 'outer,
            }
        }
        game.tick(&mut listener);
    }

    info!("game task stopped");
    game
}

impl AdapterHandle {
    async fn send(&self, cmd: Command) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| anyhow!("game task is not running"))
    }

    pub async fn select_cell(&self, player: PlayerId, pos: BlockPos) -> anyhow::Result<()> {
        self.send(Command::Event(InboundEvent::SelectCell { player, pos }))
            .await
    }

    pub async fn join_lobby(&self, player: PlayerId, tournament_points: i64) -> anyhow::Result<()> {
        self.send(Command::Event(InboundEvent::JoinLobby {
            player,
            tournament_points,
        }))
        .await
    }

    pub async fn leave(&self, player: PlayerId) -> anyhow::Result<()> {
        self.send(Command::Event(InboundEvent::Leave { player })).await
    }

    /// Ask the lobby to start a round and wait for the outcome.
    pub async fn start_round(&self) -> anyhow::Result<Result<Vec<DuelId>, LobbyError>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::StartRound(tx)).await?;
        rx.await.context("game task dropped the round reply")
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.out_tx.subscribe()
    }

    /// Stop the task, flush the ledger and hand the game back.
    pub async fn shutdown(self) -> anyhow::Result<MemoryGame> {
        // The task may already be gone; the join below reports that.
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        drop(self.cmd_tx);
        let game = self.task.await.context("game task panicked")?;
        if let Some(ledger) = self.ledger {
            ledger.await.context("ledger task panicked")?;
        }
        Ok(game)
    }
}
