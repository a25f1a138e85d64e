//! Score ledger gateway: cross-session scores and the top-N leaderboard
//!
//! The in-memory roster is authoritative for live play. The ledger only backs
//! the leaderboard, so every caller treats its failures as non-fatal.

use std::collections::HashMap;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// Table holding one row per player
const PLAYERS_TABLE: &str = "players";

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub score: u32,
}

/// Persistence collaborator for scores
pub trait ScoreLedger: Send + Sync {
    /// Insert or overwrite a player's score
    fn upsert(&self, player_id: Uuid, score: u32) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Highest scores first, ties by player id
    fn fetch_top(&self, n: usize) -> BoxFuture<'_, Result<Vec<LeaderboardEntry>, LedgerError>>;
}

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    #[error("Score ledger unavailable: {0}")]
    Unavailable(String),
}

/// Row in the `players` table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScoreRow {
    playerid: Uuid,
    score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Ledger backed by the Supabase `players` table
#[derive(Clone)]
pub struct SupabaseLedger {
    client: SupabaseClient,
}

impl SupabaseLedger {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

impl ScoreLedger for SupabaseLedger {
    fn upsert(&self, player_id: Uuid, score: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(async move {
            let row = ScoreRow {
                playerid: player_id,
                score,
                updated_at: Some(chrono::Utc::now()),
            };
            self.client.upsert(PLAYERS_TABLE, &row, "playerid").await?;
            Ok(())
        })
    }

    fn fetch_top(&self, n: usize) -> BoxFuture<'_, Result<Vec<LeaderboardEntry>, LedgerError>> {
        Box::pin(async move {
            let query = format!(
                "select=playerid,score&order=score.desc,playerid.asc&limit={}",
                n
            );
            let rows: Vec<ScoreRow> = self.client.select(PLAYERS_TABLE, &query).await?;
            Ok(rows
                .into_iter()
                .map(|row| LeaderboardEntry {
                    id: row.playerid,
                    score: row.score,
                })
                .collect())
        })
    }
}

/// Process-local ledger, used when no database is configured
#[derive(Default)]
pub struct MemoryLedger {
    scores: Mutex<HashMap<Uuid, u32>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, player_id: &Uuid) -> Option<u32> {
        self.scores.lock().get(player_id).copied()
    }
}

impl ScoreLedger for MemoryLedger {
    fn upsert(&self, player_id: Uuid, score: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        self.scores.lock().insert(player_id, score);
        Box::pin(async { Ok(()) })
    }

    fn fetch_top(&self, n: usize) -> BoxFuture<'_, Result<Vec<LeaderboardEntry>, LedgerError>> {
        let mut entries: Vec<LeaderboardEntry> = self
            .scores
            .lock()
            .iter()
            .map(|(id, score)| LeaderboardEntry {
                id: *id,
                score: *score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        entries.truncate(n);
        Box::pin(async move { Ok(entries) })
    }
}
