//! Ledger side channel.
//!
//! Score submissions are appended to a file as JSON lines by a dedicated task,
//! so file I/O never runs on the tick loop.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::protocol::ScoreSubmission;

/// Start the writer. It runs until every sender is dropped.
pub fn spawn_ledger(path: PathBuf) -> (mpsc::UnboundedSender<ScoreSubmission>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ScoreSubmission>();
    let handle = tokio::spawn(async move {
        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger unavailable, submissions dropped");
                while rx.recv().await.is_some() {}
                return;
            }
        };

        let mut buf: Vec<u8> = Vec::with_capacity(256);
        let mut written = 0usize;
        while let Some(rec) = rx.recv().await {
            buf.clear();
            if serde_json::to_writer(&mut buf, &rec).is_err() {
                continue;
            }
            buf.push(b'\n');
            if let Err(e) = file.write_all(&buf).await {
                warn!(error = %e, "ledger write failed");
                continue;
            }
            written += 1;
        }

        let _ = file.flush().await;
        debug!(written, "ledger closed");
    });
    (tx, handle)
}

/// Read a ledger file back. Blank and malformed lines are skipped.
pub async fn read_ledger(path: &Path) -> anyhow::Result<Vec<ScoreSubmission>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}
