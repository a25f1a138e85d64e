//! Score persistence: ledger gateway, Supabase integration and leaderboard

pub mod leaderboard;
pub mod ledger;
pub mod supabase;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;

pub use leaderboard::Leaderboard;
pub use ledger::{LeaderboardEntry, LedgerError, MemoryLedger, ScoreLedger, SupabaseLedger};
pub use supabase::SupabaseClient;

/// Pick the ledger back end: Supabase when configured, otherwise in-memory
pub fn ledger_from_config(config: &Config) -> Arc<dyn ScoreLedger> {
    match &config.supabase {
        Some(supabase) => match SupabaseClient::new(supabase) {
            Ok(client) => {
                info!(url = %supabase.url, "Using Supabase score ledger");
                Arc::new(SupabaseLedger::new(client))
            }
            Err(e) => {
                error!(error = %e, "Failed to build Supabase client, scores are kept in memory only");
                Arc::new(MemoryLedger::new())
            }
        },
        None => {
            warn!("SUPABASE_URL not set, scores are kept in memory only");
            Arc::new(MemoryLedger::new())
        }
    }
}
