//! Best-effort score persistence and leaderboard publication

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ws::hub::Hub;
use crate::ws::protocol::ServerMsg;

use super::ledger::ScoreLedger;

/// Pending ledger jobs before new ones are dropped
const JOB_QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
enum LedgerJob {
    /// Persist a score, then publish the leaderboard
    Record { player_id: Uuid, score: u32 },
}

/// Handle to the ledger worker. Jobs run one at a time in submission order,
/// off the game lock and off every session's read loop.
#[derive(Clone)]
pub struct Leaderboard {
    jobs: mpsc::Sender<LedgerJob>,
    ledger: Arc<dyn ScoreLedger>,
    size: usize,
}

impl Leaderboard {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn new(ledger: Arc<dyn ScoreLedger>, hub: Hub, size: usize) -> Self {
        let (jobs, rx) = mpsc::channel(JOB_QUEUE_CAPACITY);

        let worker = LedgerWorker {
            ledger: ledger.clone(),
            hub,
            size,
        };
        tokio::spawn(worker.run(rx));

        Self { jobs, ledger, size }
    }

    pub fn ledger(&self) -> &Arc<dyn ScoreLedger> {
        &self.ledger
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a score write followed by a leaderboard broadcast. Never waits.
    pub fn record(&self, player_id: Uuid, score: u32) {
        if let Err(e) = self.jobs.try_send(LedgerJob::Record { player_id, score }) {
            warn!(player_id = %player_id, score, error = %e, "Ledger queue rejected score");
        }
    }
}

struct LedgerWorker {
    ledger: Arc<dyn ScoreLedger>,
    hub: Hub,
    size: usize,
}

impl LedgerWorker {
    async fn run(self, mut rx: mpsc::Receiver<LedgerJob>) {
        while let Some(job) = rx.recv().await {
            match job {
                LedgerJob::Record { player_id, score } => {
                    match self.ledger.upsert(player_id, score).await {
                        Ok(()) => debug!(player_id = %player_id, score, "Score persisted"),
                        Err(e) => {
                            error!(player_id = %player_id, score, error = %e, "Failed to persist score")
                        }
                    }
                    self.publish().await;
                }
            }
        }
        info!("Ledger worker stopped");
    }

    /// An unavailable ledger leaves clients with their previous leaderboard
    async fn publish(&self) {
        match self.ledger.fetch_top(self.size).await {
            Ok(entries) if entries.is_empty() => {
                debug!("Leaderboard empty, nothing to publish");
            }
            Ok(entries) => {
                self.hub.broadcast(ServerMsg::Leaderboard { entries });
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch leaderboard");
            }
        }
    }
}
