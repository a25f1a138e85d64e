//! Goal/regeneration coordinator over the shared world + roster aggregate
//!
//! World store and roster live behind one mutex. Every handler holds it for
//! exactly one operation and never across an await, so moves, goals and
//! roster snapshots are serialized without blocking on I/O.

use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::roster::{Player, Roster, RosterError};
use super::world::{GenerationError, Point, World, WorldStore};

/// Points awarded for reaching the goal cell
pub const GOAL_REWARD: u32 = 10;

struct GameState {
    world: WorldStore,
    roster: Roster,
}

/// Result of a successful move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Position updated, world unchanged
    Moved(Player),
    /// Mover reached the goal and a new world was published
    GoalReached(GoalReached),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalReached {
    /// Mover after reward and reset
    pub player: Player,
    /// Newly published world
    pub world: World,
}

/// Authoritative world + roster, shared by every session and the broadcaster
pub struct GameCore {
    state: Mutex<GameState>,
}

impl GameCore {
    pub fn new(world: WorldStore) -> Self {
        Self {
            state: Mutex::new(GameState {
                world,
                roster: Roster::new(),
            }),
        }
    }

    /// Copy of the currently published world
    pub fn world(&self) -> World {
        self.state.lock().world.current().clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().world.generation()
    }

    /// Admit a session at the current start point
    pub fn admit(&self, id: Uuid) -> Result<Player, GameError> {
        let mut state = self.state.lock();
        let start = state.world.current().start;
        let player = state.roster.admit(id, start)?;

        info!(
            session_id = %id,
            x = start.x,
            y = start.y,
            players = state.roster.len(),
            "Player admitted"
        );
        Ok(player)
    }

    /// Remove a session. Returns the removed record, if any.
    pub fn remove(&self, id: &Uuid) -> Option<Player> {
        let mut state = self.state.lock();
        let removed = state.roster.remove(id);
        if removed.is_some() {
            info!(session_id = %id, players = state.roster.len(), "Player removed");
        }
        removed
    }

    /// Run `f` on the published world without letting a regeneration in
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(self.state.lock().world.current())
    }

    /// Run `f` on the current generation and a roster snapshot, under the
    /// same lock as every move and reset
    pub fn with_roster<R>(&self, f: impl FnOnce(u64, &[Player]) -> R) -> R {
        let state = self.state.lock();
        f(state.world.generation(), &state.roster.snapshot())
    }

    /// Apply a move that targets world `generation`. Reaching the goal cell
    /// regenerates the world, rewards the mover and resets everyone.
    pub fn handle_move(
        &self,
        id: &Uuid,
        target: Point,
        generation: u64,
    ) -> Result<MoveOutcome, GameError> {
        self.handle_move_and_publish(id, target, generation, |_| {})
    }

    /// Same as [`handle_move`](Self::handle_move), but `publish` runs before
    /// the lock is released whenever a new world is produced. Worlds are
    /// therefore published in generation order and no roster snapshot can
    /// slip in between the reset and its announcement. `publish` must not
    /// block or call back into this `GameCore`.
    pub fn handle_move_and_publish<F>(
        &self,
        id: &Uuid,
        target: Point,
        generation: u64,
        publish: F,
    ) -> Result<MoveOutcome, GameError>
    where
        F: FnOnce(&GoalReached),
    {
        let mut state = self.state.lock();
        let GameState { world, roster } = &mut *state;

        if !roster.contains(id) {
            return Err(RosterError::UnknownSession(*id).into());
        }
        validate_target(world.current(), target, generation)?;

        let player = roster.apply_move(id, target)?;
        if target != world.current().end {
            return Ok(MoveOutcome::Moved(player));
        }

        info!(session_id = %id, generation, "Goal reached");

        let options = *world.options();
        let new_world = world.regenerate(&options)?.clone();

        let score = roster.award(id, GOAL_REWARD)?;
        roster.reset_all(new_world.start);
        debug!(
            session_id = %id,
            score,
            players_reset = roster.len(),
            "Roster reset to new start"
        );

        let player = roster
            .get(id)
            .cloned()
            .ok_or(RosterError::UnknownSession(*id))?;

        let goal = GoalReached {
            player,
            world: new_world,
        };
        publish(&goal);

        Ok(MoveOutcome::GoalReached(goal))
    }

    pub fn player(&self, id: &Uuid) -> Option<Player> {
        self.state.lock().roster.get(id).cloned()
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().roster.len()
    }
}

fn validate_target(world: &World, target: Point, generation: u64) -> Result<(), MoveError> {
    if generation != world.generation {
        return Err(MoveError::StaleGeneration {
            received: generation,
            current: world.generation,
        });
    }
    if !world.in_bounds(target) {
        return Err(MoveError::OutOfBounds {
            x: target.x,
            y: target.y,
        });
    }
    if !world.is_walkable(target) {
        return Err(MoveError::Wall {
            x: target.x,
            y: target.y,
        });
    }
    Ok(())
}

/// Rejected move targets
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Move targets generation {received}, current generation is {current}")]
    StaleGeneration { received: u64, current: u64 },

    #[error("Cell ({x}, {y}) is outside the dungeon")]
    OutOfBounds { x: i32, y: i32 },

    #[error("Cell ({x}, {y}) is a wall")]
    Wall { x: i32, y: i32 },
}

/// Errors surfaced by game handlers. None of them are connection faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("Goal rejected, regeneration failed: {0}")]
    Generation(#[from] GenerationError),
}

impl GameError {
    /// Short machine-readable code for client error messages
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Roster(RosterError::DuplicateSession(_)) => "already_started",
            GameError::Roster(RosterError::UnknownSession(_)) => "not_started",
            GameError::Move(MoveError::StaleGeneration { .. }) => "stale_generation",
            GameError::Move(MoveError::OutOfBounds { .. }) => "out_of_bounds",
            GameError::Move(MoveError::Wall { .. }) => "wall",
            GameError::Generation(_) => "generation_failed",
        }
    }
}
