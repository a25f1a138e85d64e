//! Roster of admitted players

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::world::Point;

/// Live state of one admitted session (authoritative)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: Uuid,
    pub position: Point,
    pub score: u32,
}

/// Owns every player record. Callers get copies, never references that
/// outlive one operation.
#[derive(Debug, Default)]
pub struct Roster {
    players: HashMap<Uuid, Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a session at `start` with a zero score
    pub fn admit(&mut self, id: Uuid, start: Point) -> Result<Player, RosterError> {
        if self.players.contains_key(&id) {
            return Err(RosterError::DuplicateSession(id));
        }

        let player = Player {
            id,
            position: start,
            score: 0,
        };
        self.players.insert(id, player.clone());
        Ok(player)
    }

    /// Remove a session. Absent ids are ignored.
    pub fn remove(&mut self, id: &Uuid) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn apply_move(&mut self, id: &Uuid, position: Point) -> Result<Player, RosterError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or(RosterError::UnknownSession(*id))?;
        player.position = position;
        Ok(player.clone())
    }

    /// Add `points` to a player's score and return the new total
    pub fn award(&mut self, id: &Uuid, points: u32) -> Result<u32, RosterError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or(RosterError::UnknownSession(*id))?;
        player.score = player.score.saturating_add(points);
        Ok(player.score)
    }

    /// Move every player to `start`. Scores are untouched.
    pub fn reset_all(&mut self, start: Point) {
        for player in self.players.values_mut() {
            player.position = start;
        }
    }

    /// Owned copy of every player, ordered by id
    pub fn snapshot(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    pub fn get(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Roster errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("Session {0} is already admitted")]
    DuplicateSession(Uuid),

    #[error("Session {0} is not in the roster")]
    UnknownSession(Uuid),
}
