use crate::model::RunStatus;
use crate::storage::Store;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: i64,
    pub current: u32,
    pub total: u32,
    pub status: RunStatus,
}

/// Poll-based progress stream: reads the persisted run at the given
/// interval and forwards changed snapshots until the run turns
/// terminal. Readers are fully decoupled from run workers, so any
/// number of watchers can attach and a stalled worker never blocks
/// them. The terminal snapshot is always delivered before close.
pub fn watch(store: Store, run_id: i64, interval: Duration) -> mpsc::Receiver<ProgressSnapshot> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut last: Option<ProgressSnapshot> = None;
        loop {
            let run = match store.get_run(run_id) {
                Ok(Some(run)) => run,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(run_id, error = %e, "progress poll failed");
                    break;
                }
            };
            let snapshot = ProgressSnapshot {
                run_id,
                current: run.progress_current,
                total: run.progress_total,
                status: run.status,
            };
            if last != Some(snapshot) {
                last = Some(snapshot);
                if tx.send(snapshot).await.is_err() {
                    break;
                }
            }
            if snapshot.status.is_terminal() {
                break;
            }
            tokio::time::sleep(interval).await;
        }
    });
    rx
}
