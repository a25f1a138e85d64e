//! Application state shared across routes and sessions

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::game::{GameCore, GenerationError, MazeGenerator, RoomsAndCorridors, WorldStore};
use crate::store::{ledger_from_config, Leaderboard, ScoreLedger};
use crate::ws::hub::Hub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: Arc<GameCore>,
    pub hub: Hub,
    pub leaderboard: Leaderboard,
    pub started_at: Instant,
}

impl AppState {
    /// Build state from configuration: default generator, configured ledger
    pub fn from_config(config: Config) -> Result<Self, GenerationError> {
        let generator: Box<dyn MazeGenerator> = match config.dungeon_seed {
            Some(seed) => Box::new(RoomsAndCorridors::seeded(seed)),
            None => Box::new(RoomsAndCorridors::new()),
        };
        let ledger = ledger_from_config(&config);
        Self::new(config, generator, ledger)
    }

    /// Generates the first world; fails if that is impossible
    pub fn new(
        config: Config,
        generator: Box<dyn MazeGenerator>,
        ledger: Arc<dyn ScoreLedger>,
    ) -> Result<Self, GenerationError> {
        let config = Arc::new(config);

        let world = WorldStore::new(generator, config.dungeon)?;
        let game = Arc::new(GameCore::new(world));

        let hub = Hub::new();
        let leaderboard = Leaderboard::new(ledger, hub.clone(), config.leaderboard_size);

        Ok(Self {
            config,
            game,
            hub,
            leaderboard,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
