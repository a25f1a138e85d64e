//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{Player, Point, World};
use crate::store::LeaderboardEntry;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Join the game with the current world
    Start,

    /// Move to an absolute cell
    Move {
        x: i32,
        y: i32,
        /// Generation of the world the client computed this move against
        generation: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Full world snapshot. Sent on connect and after every regeneration.
    World(World),

    /// The session's own record, sent once after `start`
    PlayerAssigned(PlayerView),

    /// Every admitted player (sent at regular intervals)
    RosterUpdate {
        /// Broadcast tick number
        tick: u64,
        /// World the positions belong to; clients drop updates for other generations
        generation: u64,
        players: Vec<PlayerView>,
    },

    /// All players were moved to the new start point
    PositionsReset(Point),

    /// New score for the receiving session
    ScoreUpdate {
        score: u32,
    },

    /// Top scores from the ledger, highest first
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },

    /// Event was dropped
    Error {
        code: String,
        message: String,
    },
}

/// Player state on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: Uuid,
    pub x: i32,
    pub y: i32,
    pub score: u32,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.position.x,
            y: p.position.y,
            score: p.score,
        }
    }
}
