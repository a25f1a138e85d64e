//! Fixed-period roster broadcast, independent of game events

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace};

use crate::ws::hub::Hub;
use crate::ws::protocol::ServerMsg;

use super::snapshot::SnapshotBuilder;
use super::GameCore;

/// Pushes the full roster to every connection each period
pub struct BroadcastScheduler {
    game: Arc<GameCore>,
    hub: Hub,
    period: Duration,
    snapshot_builder: SnapshotBuilder,
}

impl BroadcastScheduler {
    pub fn new(game: Arc<GameCore>, hub: Hub, period: Duration) -> Self {
        Self {
            game,
            hub,
            period,
            snapshot_builder: SnapshotBuilder::new(),
        }
    }

    /// Take one roster snapshot and broadcast it. Both happen under the game
    /// lock, so the update can neither see a half-applied reset nor be queued
    /// behind the world it predates.
    pub fn tick(&mut self) -> ServerMsg {
        let Self {
            game,
            hub,
            snapshot_builder,
            ..
        } = self;

        let (msg, players, receivers) = game.with_roster(|generation, players| {
            let msg = snapshot_builder.build(generation, players);
            let receivers = hub.broadcast(msg.clone());
            (msg, players.len(), receivers)
        });

        trace!(
            tick = snapshot_builder.tick(),
            players,
            receivers,
            "Roster broadcast"
        );
        msg
    }

    /// Run forever. Late ticks are skipped rather than bunched up.
    pub async fn run(mut self) {
        info!(period_ms = self.period.as_millis() as u64, "Broadcast scheduler started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}
