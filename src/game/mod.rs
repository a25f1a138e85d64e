//! Game state modules

pub mod broadcast;
pub mod coordinator;
pub mod generator;
pub mod roster;
pub mod snapshot;
pub mod world;

pub use broadcast::BroadcastScheduler;
pub use coordinator::{GameCore, GameError, MoveError, MoveOutcome};
pub use generator::{MazeGenerator, RoomsAndCorridors};
pub use roster::Player;
pub use world::{GenerationError, GenerationOptions, Point, World, WorldStore};

#[cfg(test)]
pub(crate) mod testing {
    use super::generator::MazeGenerator;
    use super::world::{GenerationError, GenerationOptions, Maze, Room, WorldStore, CORRIDOR, WALL};
    use super::{GameCore, RoomsAndCorridors};

    /// 12x7 grid: room 2 at (1,1) 3x3, room 3 at (7,2) 4x3, joined by a corridor on row 2
    pub fn two_room_maze() -> Maze {
        let rooms = vec![Room::new(2, 1, 1, 3, 3), Room::new(3, 7, 2, 4, 3)];
        let mut grid = vec![vec![WALL; 12]; 7];
        for room in &rooms {
            for y in room.y..room.y + room.height {
                for x in room.x..room.x + room.width {
                    grid[y as usize][x as usize] = room.id;
                }
            }
        }
        for x in 4..7 {
            grid[2][x] = CORRIDOR;
        }
        Maze {
            grid,
            width: 12,
            height: 7,
            rooms,
        }
    }

    /// Returns the two-room maze for the first `n` calls, then a maze with a
    /// single room.
    pub struct ScriptedGenerator {
        remaining_ok: usize,
    }

    impl ScriptedGenerator {
        pub fn fail_after(n: usize) -> Self {
            Self { remaining_ok: n }
        }
    }

    impl MazeGenerator for ScriptedGenerator {
        fn generate(&mut self, _options: &GenerationOptions) -> Result<Maze, GenerationError> {
            let mut maze = two_room_maze();
            if self.remaining_ok == 0 {
                maze.rooms.truncate(1);
            } else {
                self.remaining_ok -= 1;
            }
            Ok(maze)
        }
    }

    pub fn core_with_seed(seed: u64) -> GameCore {
        let store = WorldStore::new(
            Box::new(RoomsAndCorridors::seeded(seed)),
            GenerationOptions::default(),
        )
        .expect("default options generate a world");
        GameCore::new(store)
    }
}
