//! Maze generation collaborator and the default rooms-and-corridors generator

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::world::{GenerationError, GenerationOptions, Maze, Point, Room, CORRIDOR, FIRST_ROOM_ID, WALL};

/// Smallest room side the default generator will carve
const MIN_ROOM_SIDE: i32 = 3;
/// Placement attempts allowed per requested room before giving up
const PLACEMENT_ATTEMPTS_PER_ROOM: u32 = 50;

/// Produces a grid plus room metadata. Output is validated by the world
/// store, so implementations may report failure either way.
pub trait MazeGenerator: Send {
    fn generate(&mut self, options: &GenerationOptions) -> Result<Maze, GenerationError>;
}

/// Places non-touching rectangular rooms at random and links each room to the
/// next one with an L-shaped corridor. Room ids follow placement order, so
/// consecutive ids are always connected.
pub struct RoomsAndCorridors {
    rng: ChaCha8Rng,
}

impl RoomsAndCorridors {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministic generator, for reproducible dungeons
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn place_rooms(&mut self, options: &GenerationOptions) -> Result<Vec<Room>, GenerationError> {
        let width = options.width as i32;
        let height = options.height as i32;

        // Keep a one-cell wall border around the grid
        let max_side = (options.average_room_size as i32)
            .min(width - 2)
            .min(height - 2);
        if max_side < MIN_ROOM_SIDE {
            return Err(GenerationError::InvalidOptions(format!(
                "{}x{} grid cannot fit a {}x{} room",
                width, height, MIN_ROOM_SIDE, MIN_ROOM_SIDE
            )));
        }
        let min_side = (max_side / 2).max(MIN_ROOM_SIDE);

        let wanted = options.room_count as usize;
        let mut rooms: Vec<Room> = Vec::with_capacity(wanted);

        let attempts = options.room_count.saturating_mul(PLACEMENT_ATTEMPTS_PER_ROOM);
        for _ in 0..attempts {
            if rooms.len() >= wanted {
                break;
            }

            let w = self.rng.gen_range(min_side..=max_side);
            let h = self.rng.gen_range(min_side..=max_side);
            let x = self.rng.gen_range(1..=width - 1 - w);
            let y = self.rng.gen_range(1..=height - 1 - h);

            if rooms.iter().any(|r| too_close(r, x, y, w, h)) {
                continue;
            }

            let id = FIRST_ROOM_ID + rooms.len() as u32;
            rooms.push(Room::new(id, x, y, w, h));
        }

        Ok(rooms)
    }

    fn carve_corridor(&mut self, grid: &mut [Vec<u32>], from: Point, to: Point) {
        let corner = if self.rng.gen_bool(0.5) {
            Point::new(to.x, from.y)
        } else {
            Point::new(from.x, to.y)
        };
        carve_line(grid, from, corner);
        carve_line(grid, corner, to);
    }
}

impl Default for RoomsAndCorridors {
    fn default() -> Self {
        Self::new()
    }
}

impl MazeGenerator for RoomsAndCorridors {
    fn generate(&mut self, options: &GenerationOptions) -> Result<Maze, GenerationError> {
        options.validate()?;

        let rooms = self.place_rooms(options)?;
        let mut grid = vec![vec![WALL; options.width as usize]; options.height as usize];

        for room in &rooms {
            for y in room.y..room.y + room.height {
                for x in room.x..room.x + room.width {
                    grid[y as usize][x as usize] = room.id;
                }
            }
        }

        let centers: Vec<Point> = rooms.iter().map(Room::center).collect();
        for pair in centers.windows(2) {
            self.carve_corridor(&mut grid, pair[0], pair[1]);
        }

        Ok(Maze {
            grid,
            width: options.width,
            height: options.height,
            rooms,
        })
    }
}

/// True if the candidate rectangle overlaps `room` or touches it without a
/// wall cell in between.
fn too_close(room: &Room, x: i32, y: i32, w: i32, h: i32) -> bool {
    x <= room.x + room.width
        && room.x <= x + w
        && y <= room.y + room.height
        && room.y <= y + h
}

/// Carve a straight horizontal or vertical run. Room cells keep their id.
fn carve_line(grid: &mut [Vec<u32>], from: Point, to: Point) {
    let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
    let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));

    for y in y0..=y1 {
        for x in x0..=x1 {
            let cell = &mut grid[y as usize][x as usize];
            if *cell == WALL {
                *cell = CORRIDOR;
            }
        }
    }
}
