//! World store: the published maze snapshot and its generation counter

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::generator::MazeGenerator;

/// Impassable cell
pub const WALL: u32 = 0;
/// Corridor cell
pub const CORRIDOR: u32 = 1;
/// Id of the first generated room; later rooms count up from here
pub const FIRST_ROOM_ID: u32 = 2;

/// A grid cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Largest accepted grid side
pub const MAX_GRID_SIDE: u32 = 512;
/// Largest accepted room count
pub const MAX_ROOM_COUNT: u32 = 1024;

/// Options handed to the maze generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    pub width: u32,
    pub height: u32,
    /// Requested room count. Must be at least 2 so start and end differ.
    pub room_count: u32,
    pub average_room_size: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            room_count: 6,
            average_room_size: 8,
        }
    }
}

impl GenerationOptions {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_GRID_SIDE
            || self.height > MAX_GRID_SIDE
        {
            return Err(GenerationError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !(2..=MAX_ROOM_COUNT).contains(&self.room_count) {
            return Err(GenerationError::InvalidOptions(format!(
                "room_count must be between 2 and {}, got {}",
                MAX_ROOM_COUNT, self.room_count
            )));
        }
        if self.average_room_size == 0 {
            return Err(GenerationError::InvalidOptions(
                "average_room_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Room descriptor as produced by the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: u32,
    /// Top-left corner
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub center_x: i32,
    pub center_y: i32,
}

impl Room {
    pub fn new(id: u32, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            center_x: x + width / 2,
            center_y: y + height / 2,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

/// Raw generator output, not yet validated
#[derive(Debug, Clone)]
pub struct Maze {
    /// Cell codes indexed `grid[y][x]`
    pub grid: Vec<Vec<u32>>,
    pub width: u32,
    pub height: u32,
    pub rooms: Vec<Room>,
}

/// One published generation of the dungeon. Serializes directly as the
/// `world` message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub grid: Vec<Vec<u32>>,
    pub width: u32,
    pub height: u32,
    pub rooms: Vec<Room>,
    /// Average room size the world was generated with
    pub room_size: u32,
    pub generation: u64,
    pub start: Point,
    pub end: Point,
}

impl World {
    /// Validate generator output and derive start/end from the room list.
    pub fn from_maze(
        maze: Maze,
        options: &GenerationOptions,
        generation: u64,
    ) -> Result<Self, GenerationError> {
        if maze.width == 0 || maze.height == 0 {
            return Err(GenerationError::InvalidDimensions {
                width: maze.width,
                height: maze.height,
            });
        }
        if maze.grid.len() != maze.height as usize
            || maze.grid.iter().any(|row| row.len() != maze.width as usize)
        {
            return Err(GenerationError::GridMismatch {
                width: maze.width,
                height: maze.height,
            });
        }
        if maze.rooms.is_empty() {
            return Err(GenerationError::MissingRooms);
        }
        if maze.rooms.len() < 2 {
            return Err(GenerationError::TooFewRooms {
                found: maze.rooms.len(),
            });
        }
        for (expected, room) in (FIRST_ROOM_ID..).zip(&maze.rooms) {
            if room.id != expected {
                return Err(GenerationError::RoomOrder {
                    expected,
                    found: room.id,
                });
            }
        }

        let mut world = Self {
            grid: maze.grid,
            width: maze.width,
            height: maze.height,
            rooms: maze.rooms,
            room_size: options.average_room_size,
            generation,
            start: Point::new(0, 0),
            end: Point::new(0, 0),
        };

        // Room ids are contiguous from FIRST_ROOM_ID, so first/last are start/end
        let (start_room, end_room) = match (world.rooms.first(), world.rooms.last()) {
            (Some(first), Some(last)) => (first.clone(), last.clone()),
            _ => return Err(GenerationError::MissingRooms),
        };
        for room in [&start_room, &end_room] {
            if !world.is_walkable(room.center()) {
                return Err(GenerationError::CenterNotWalkable { room: room.id });
            }
        }
        world.start = start_room.center();
        world.end = end_room.center();

        Ok(world)
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    /// Cell code at `p`, or `None` when off the grid
    pub fn cell(&self, p: Point) -> Option<u32> {
        if !self.in_bounds(p) {
            return None;
        }
        self.grid
            .get(p.y as usize)
            .and_then(|row| row.get(p.x as usize))
            .copied()
    }

    pub fn is_walkable(&self, p: Point) -> bool {
        matches!(self.cell(p), Some(code) if code != WALL)
    }
}

/// Owns the generator and the currently published world
pub struct WorldStore {
    generator: Box<dyn MazeGenerator>,
    options: GenerationOptions,
    current: World,
}

impl WorldStore {
    /// Generate the first world (generation 1). Fails if the generator cannot
    /// produce a valid world, since there is nothing to fall back to.
    pub fn new(
        mut generator: Box<dyn MazeGenerator>,
        options: GenerationOptions,
    ) -> Result<Self, GenerationError> {
        options.validate()?;
        let maze = generator.generate(&options)?;
        let current = World::from_maze(maze, &options, 1)?;

        info!(
            generation = current.generation,
            rooms = current.rooms.len(),
            "Initial dungeon generated"
        );

        Ok(Self {
            generator,
            options,
            current,
        })
    }

    pub fn current(&self) -> &World {
        &self.current
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn generation(&self) -> u64 {
        self.current.generation
    }

    /// Build and publish the next generation. On any failure the previous
    /// world stays published and the counter does not move.
    pub fn regenerate(&mut self, options: &GenerationOptions) -> Result<&World, GenerationError> {
        let next_generation = self.current.generation + 1;

        let result = options
            .validate()
            .and_then(|()| self.generator.generate(options))
            .and_then(|maze| World::from_maze(maze, options, next_generation));

        match result {
            Ok(world) => {
                info!(
                    generation = world.generation,
                    rooms = world.rooms.len(),
                    start_x = world.start.x,
                    start_y = world.start.y,
                    end_x = world.end.x,
                    end_y = world.end.y,
                    "Dungeon regenerated"
                );
                self.options = *options;
                self.current = world;
                Ok(&self.current)
            }
            Err(e) => {
                warn!(
                    generation = self.current.generation,
                    error = %e,
                    "Dungeon regeneration failed, keeping current world"
                );
                Err(e)
            }
        }
    }
}

/// Generation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid generation options: {0}")]
    InvalidOptions(String),

    #[error("Invalid dungeon dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Grid does not match reported dimensions {width}x{height}")]
    GridMismatch { width: u32, height: u32 },

    #[error("Generator returned no room list")]
    MissingRooms,

    #[error("Generator produced {found} room(s), at least 2 are required")]
    TooFewRooms { found: usize },

    #[error("Room ids out of order: expected {expected}, found {found}")]
    RoomOrder { expected: u32, found: u32 },

    #[error("Center of room {room} is not a walkable cell")]
    CenterNotWalkable { room: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::generator::RoomsAndCorridors;
    use crate::game::testing::{two_room_maze, ScriptedGenerator};

    #[test]
    fn test_from_maze_derives_start_and_end() {
        let world = World::from_maze(two_room_maze(), &GenerationOptions::default(), 1).unwrap();
        assert_eq!(world.start, world.rooms[0].center());
        assert_eq!(world.end, world.rooms[1].center());
        assert_ne!(world.start, world.end);
        assert!(world.is_walkable(world.start));
        assert!(world.is_walkable(world.end));
    }

    #[test]
    fn test_single_room_is_rejected() {
        let mut maze = two_room_maze();
        maze.rooms.truncate(1);
        let err = World::from_maze(maze, &GenerationOptions::default(), 1).unwrap_err();
        assert_eq!(err, GenerationError::TooFewRooms { found: 1 });
    }

    #[test]
    fn test_missing_room_list_is_rejected() {
        let mut maze = two_room_maze();
        maze.rooms.clear();
        let err = World::from_maze(maze, &GenerationOptions::default(), 1).unwrap_err();
        assert_eq!(err, GenerationError::MissingRooms);
    }

    #[test]
    fn test_mismatched_grid_is_rejected() {
        let mut maze = two_room_maze();
        maze.grid.pop();
        let err = World::from_maze(maze, &GenerationOptions::default(), 1).unwrap_err();
        assert!(matches!(err, GenerationError::GridMismatch { .. }));
    }

    #[test]
    fn test_room_center_on_wall_is_rejected() {
        let mut maze = two_room_maze();
        let center = maze.rooms[1].center();
        maze.grid[center.y as usize][center.x as usize] = WALL;
        let err = World::from_maze(maze, &GenerationOptions::default(), 1).unwrap_err();
        assert_eq!(err, GenerationError::CenterNotWalkable { room: 3 });
    }

    #[test]
    fn test_options_require_two_rooms() {
        let options = GenerationOptions {
            room_count: 1,
            ..GenerationOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(GenerationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_options_reject_oversized_dungeons() {
        let too_wide = GenerationOptions {
            width: MAX_GRID_SIDE + 1,
            ..GenerationOptions::default()
        };
        assert!(matches!(
            too_wide.validate(),
            Err(GenerationError::InvalidDimensions { .. })
        ));

        let too_many_rooms = GenerationOptions {
            room_count: u32::MAX,
            ..GenerationOptions::default()
        };
        assert!(matches!(
            too_many_rooms.validate(),
            Err(GenerationError::InvalidOptions(_))
        ));

        let largest = GenerationOptions {
            width: MAX_GRID_SIDE,
            height: MAX_GRID_SIDE,
            room_count: MAX_ROOM_COUNT,
            ..GenerationOptions::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_cell_lookup_outside_grid() {
        let world = World::from_maze(two_room_maze(), &GenerationOptions::default(), 1).unwrap();
        assert_eq!(world.cell(Point::new(-1, 0)), None);
        assert_eq!(world.cell(Point::new(0, world.height as i32)), None);
        assert!(!world.is_walkable(Point::new(0, 0)));
    }

    #[test]
    fn test_store_starts_at_generation_one() {
        let store = WorldStore::new(
            Box::new(RoomsAndCorridors::seeded(7)),
            GenerationOptions::default(),
        )
        .unwrap();
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_regenerate_increments_generation() {
        let mut store = WorldStore::new(
            Box::new(RoomsAndCorridors::seeded(7)),
            GenerationOptions::default(),
        )
        .unwrap();
        let options = *store.options();

        for expected in 2..=5 {
            let world = store.regenerate(&options).unwrap();
            assert_eq!(world.generation, expected);
            assert_ne!(world.start, world.end);
        }
    }

    #[test]
    fn test_failed_regeneration_keeps_previous_world() {
        let mut store = WorldStore::new(
            Box::new(ScriptedGenerator::fail_after(1)),
            GenerationOptions::default(),
        )
        .unwrap();
        let before = store.current().clone();
        let options = *store.options();

        let err = store.regenerate(&options).unwrap_err();
        assert_eq!(err, GenerationError::TooFewRooms { found: 1 });
        assert_eq!(store.current(), &before);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_initial_generation_failure_is_fatal() {
        let result = WorldStore::new(
            Box::new(ScriptedGenerator::fail_after(0)),
            GenerationOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_world_serializes_with_wire_field_names() {
        let world = World::from_maze(two_room_maze(), &GenerationOptions::default(), 4).unwrap();
        let json = serde_json::to_value(&world).unwrap();
        assert_eq!(json["roomSize"], 8);
        assert_eq!(json["generation"], 4);
        assert!(json["rooms"][0]["centerX"].is_number());
        assert_eq!(json["start"]["x"], world.start.x);
    }
}
