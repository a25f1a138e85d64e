//! Per-connection session lifecycle: CONNECTED -> ACTIVE -> TERMINATED

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::game::{GameCore, GameError, MoveError, MoveOutcome, Point};
use crate::store::Leaderboard;
use crate::ws::hub::Hub;
use crate::ws::protocol::{ClientMsg, PlayerView, ServerMsg};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// World sent, no roster entry yet
    Connected,
    /// Admitted to the roster
    Active,
    /// Disconnected; every further event is ignored
    Terminated,
}

/// One connected client. Drives the shared game on its behalf and routes the
/// resulting messages through the hub.
pub struct Session {
    id: Uuid,
    state: SessionState,
    game: Arc<GameCore>,
    hub: Hub,
    leaderboard: Leaderboard,
}

impl Session {
    /// Enter CONNECTED and push the current world to the client. The hub
    /// must already have a direct channel registered for `id`.
    pub fn open(id: Uuid, game: Arc<GameCore>, hub: Hub, leaderboard: Leaderboard) -> Self {
        // Queued under the game lock so a concurrent regeneration cannot
        // overtake it on the broadcast channel
        game.with_world(|world| {
            debug!(session_id = %id, generation = world.generation, "Sending dungeon data");
            hub.send_to(&id, ServerMsg::World(world.clone()));
        });

        Self {
            id,
            state: SessionState::Connected,
            game,
            hub,
            leaderboard,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Dispatch one inbound message
    pub fn handle(&mut self, msg: ClientMsg) {
        match (self.state, msg) {
            (SessionState::Connected, ClientMsg::Start) => self.start(),
            (SessionState::Active, ClientMsg::Move { x, y, generation }) => {
                self.apply_move(Point::new(x, y), generation)
            }
            (SessionState::Active, ClientMsg::Start) => {
                warn!(session_id = %self.id, "Duplicate start signal");
                self.reject("already_started", "Session already started");
            }
            (SessionState::Connected, ClientMsg::Move { .. }) => {
                warn!(session_id = %self.id, "Move before start");
                self.reject("not_started", "Send start before moving");
            }
            (SessionState::Terminated, msg) => {
                debug!(session_id = %self.id, ?msg, "Event after disconnect ignored");
            }
        }
    }

    /// CONNECTED -> ACTIVE
    fn start(&mut self) {
        let player = match self.game.admit(self.id) {
            Ok(player) => player,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Admission rejected");
                self.reject(e.code(), &e.to_string());
                return;
            }
        };

        self.state = SessionState::Active;
        self.hub
            .send_to(&self.id, ServerMsg::PlayerAssigned(PlayerView::from(&player)));
        self.leaderboard.record(player.id, player.score);
    }

    fn apply_move(&mut self, target: Point, generation: u64) {
        let hub = &self.hub;
        let outcome = self
            .game
            .handle_move_and_publish(&self.id, target, generation, |goal| {
                hub.broadcast(ServerMsg::World(goal.world.clone()));
                hub.broadcast(ServerMsg::PositionsReset(goal.world.start));
            });

        match outcome {
            Ok(MoveOutcome::Moved(_)) => {}
            Ok(MoveOutcome::GoalReached(goal)) => {
                info!(
                    session_id = %self.id,
                    score = goal.player.score,
                    generation = goal.world.generation,
                    "New dungeon published"
                );

                self.hub.send_to(
                    &self.id,
                    ServerMsg::ScoreUpdate {
                        score: goal.player.score,
                    },
                );
                self.leaderboard.record(goal.player.id, goal.player.score);
            }
            Err(e @ GameError::Generation(_)) => {
                error!(session_id = %self.id, error = %e, "Goal rejected");
            }
            Err(e @ GameError::Move(MoveError::StaleGeneration { .. })) => {
                // The client missed a world, most likely by lagging behind
                // the broadcast channel. Resend it so its next move counts.
                debug!(session_id = %self.id, error = %e, "Stale move, resending world");
                self.reject(e.code(), &e.to_string());
                self.game.with_world(|world| {
                    self.hub.send_to(&self.id, ServerMsg::World(world.clone()));
                });
            }
            Err(e) => {
                debug!(session_id = %self.id, error = %e, "Move rejected");
                self.reject(e.code(), &e.to_string());
            }
        }
    }

    /// ACTIVE -> TERMINATED. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        if self.state == SessionState::Active {
            self.game.remove(&self.id);
        }
        self.state = SessionState::Terminated;
        info!(session_id = %self.id, "Session terminated");
    }

    fn reject(&self, code: &str, message: &str) {
        self.hub.send_to(
            &self.id,
            ServerMsg::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
