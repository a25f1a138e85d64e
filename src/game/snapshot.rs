//! Snapshot building for roster broadcasts

use crate::ws::protocol::{PlayerView, ServerMsg};

use super::Player;

/// Builds numbered roster snapshots for network transmission
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Snapshots built so far
    tick: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next roster update for world `generation`. Always a full
    /// snapshot, never a delta.
    pub fn build(&mut self, generation: u64, players: &[Player]) -> ServerMsg {
        self.tick += 1;

        ServerMsg::RosterUpdate {
            tick: self.tick,
            generation,
            players: players.iter().map(PlayerView::from).collect(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}
