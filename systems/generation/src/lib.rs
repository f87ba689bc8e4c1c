#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded rooms-and-corridors level generator.
//!
//! Rooms are rectangles carved out of solid rock, each joined to the previous
//! one by an L-shaped corridor. Narrow corridor mouths may receive doors,
//! large rooms may hold a pool of water, and grass grows in patches. The same
//! seed and settings always produce the same level.

use delve_core::{CellCoord, Direction, GenerationError, Terrain};
use delve_world::{GeneratedLevel, GridMap, MapGenerator};
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest accepted grid edge, border walls included.
pub const MINIMUM_EDGE: u32 = 5;

const POOL_MINIMUM_ROOM: u32 = 5;

/// Tunables for [`RoomsAndCorridors`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Width of the level in cells.
    pub width: u32,
    /// Height of the level in cells.
    pub height: u32,
    /// Number of room placements attempted; overlapping candidates are dropped.
    pub room_attempts: u32,
    /// Smallest room edge, walls excluded.
    pub min_room: u32,
    /// Largest room edge, walls excluded.
    pub max_room: u32,
    /// Probability that a narrow corridor mouth receives a closed door.
    pub door_chance: f64,
    /// Number of water pools placed in large rooms.
    pub water_pools: u32,
    /// Number of grass patches scattered across rooms.
    pub grass_patches: u32,
}

impl GeneratorSettings {
    /// Checks that the settings can produce a level.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.width < MINIMUM_EDGE || self.height < MINIMUM_EDGE {
            return Err(GenerationError::TooSmall {
                width: self.width,
                height: self.height,
                minimum: MINIMUM_EDGE,
            });
        }

        if self.room_attempts == 0 {
            return Err(GenerationError::InvalidSettings(
                "room_attempts must be positive",
            ));
        }

        if self.min_room == 0 || self.min_room > self.max_room {
            return Err(GenerationError::InvalidSettings(
                "room sizes must satisfy 1 <= min_room <= max_room",
            ));
        }

        if self.max_room + 2 > self.width || self.max_room + 2 > self.height {
            return Err(GenerationError::InvalidSettings(
                "max_room must leave space for the border walls",
            ));
        }

        if !(0.0..=1.0).contains(&self.door_chance) {
            return Err(GenerationError::InvalidSettings(
                "door_chance must lie within [0, 1]",
            ));
        }

        Ok(())
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            width: 40,
            height: 25,
            room_attempts: 24,
            min_room: 3,
            max_room: 8,
            door_chance: 0.5,
            water_pools: 2,
            grass_patches: 3,
        }
    }
}

/// Generator producing connected rooms joined by corridors.
#[derive(Clone, Debug)]
pub struct RoomsAndCorridors {
    settings: GeneratorSettings,
}

impl RoomsAndCorridors {
    /// Creates a generator after validating its settings.
    pub fn new(settings: GeneratorSettings) -> Result<Self, GenerationError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Settings the generator was created with.
    #[must_use]
    pub const fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }
}

impl MapGenerator for RoomsAndCorridors {
    fn generate(&mut self, seed: u64) -> Result<GeneratedLevel, GenerationError> {
        let settings = &self.settings;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut map = GridMap::new(settings.width, settings.height, Terrain::Wall);

        let rooms = carve_rooms(&mut map, &mut rng, settings);
        place_doors(&mut map, &mut rng, &rooms, settings.door_chance);
        place_pools(&mut map, &mut rng, &rooms, settings.water_pools);
        place_grass(&mut map, &mut rng, &rooms, settings.grass_patches);

        let spawn = choose_spawn(&map, &mut rng).ok_or(GenerationError::NoFloor)?;
        debug!(seed, rooms = rooms.len(), %spawn, "level generated");
        Ok(GeneratedLevel { map, spawn })
    }
}

/// Rectangular room interior with inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Room {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl Room {
    fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    fn center(&self) -> CellCoord {
        CellCoord::new((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// Reports whether the interiors overlap or touch without a wall between them.
    fn crowds(&self, other: &Room) -> bool {
        self.left <= other.right + 1
            && other.left <= self.right + 1
            && self.top <= other.bottom + 1
            && other.top <= self.bottom + 1
    }

    fn contains(&self, cell: CellCoord) -> bool {
        (self.left..=self.right).contains(&cell.column())
            && (self.top..=self.bottom).contains(&cell.row())
    }

    fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (self.top..=self.bottom).flat_map(move |row| {
            (self.left..=self.right).map(move |column| CellCoord::new(column, row))
        })
    }

    /// Wall cells bordering the interior, corners excluded, each paired with
    /// the directions of its two neighbours along the wall.
    fn walls(&self) -> Vec<(CellCoord, [Direction; 2])> {
        let mut walls = Vec::new();
        for column in self.left..=self.right {
            walls.push((
                CellCoord::new(column, self.top - 1),
                [Direction::West, Direction::East],
            ));
            walls.push((
                CellCoord::new(column, self.bottom + 1),
                [Direction::West, Direction::East],
            ));
        }
        for row in self.top..=self.bottom {
            walls.push((
                CellCoord::new(self.left - 1, row),
                [Direction::North, Direction::South],
            ));
            walls.push((
                CellCoord::new(self.right + 1, row),
                [Direction::North, Direction::South],
            ));
        }
        walls
    }
}

fn carve_rooms(map: &mut GridMap, rng: &mut ChaCha8Rng, settings: &GeneratorSettings) -> Vec<Room> {
    let mut rooms: Vec<Room> = Vec::new();
    for _ in 0..settings.room_attempts {
        let width = rng.gen_range(settings.min_room..=settings.max_room);
        let height = rng.gen_range(settings.min_room..=settings.max_room);
        let left = rng.gen_range(1..=settings.width - 1 - width);
        let top = rng.gen_range(1..=settings.height - 1 - height);
        let room = Room {
            left,
            top,
            right: left + width - 1,
            bottom: top + height - 1,
        };

        if rooms.iter().any(|other| room.crowds(other)) {
            continue;
        }

        for cell in room.cells() {
            carve(map, cell);
        }
        if let Some(previous) = rooms.last() {
            carve_corridor(map, rng, previous.center(), room.center());
        }
        rooms.push(room);
    }
    rooms
}

fn carve_corridor(map: &mut GridMap, rng: &mut ChaCha8Rng, from: CellCoord, to: CellCoord) {
    if rng.gen_bool(0.5) {
        carve_horizontal(map, from.column(), to.column(), from.row());
        carve_vertical(map, from.row(), to.row(), to.column());
    } else {
        carve_vertical(map, from.row(), to.row(), from.column());
        carve_horizontal(map, from.column(), to.column(), to.row());
    }
}

fn carve_horizontal(map: &mut GridMap, from: u32, to: u32, row: u32) {
    for column in from.min(to)..=from.max(to) {
        carve(map, CellCoord::new(column, row));
    }
}

fn carve_vertical(map: &mut GridMap, from: u32, to: u32, column: u32) {
    for row in from.min(to)..=from.max(to) {
        carve(map, CellCoord::new(column, row));
    }
}

fn carve(map: &mut GridMap, cell: CellCoord) {
    if map.terrain(cell) == Ok(Terrain::Wall) {
        let _ = map.set_terrain(cell, Terrain::Floor);
    }
}

fn place_doors(map: &mut GridMap, rng: &mut ChaCha8Rng, rooms: &[Room], chance: f64) {
    for room in rooms {
        for (cell, sides) in room.walls() {
            if map.terrain(cell) != Ok(Terrain::Floor) {
                continue;
            }

            let narrow = sides.iter().all(|side| {
                cell.step(*side)
                    .is_some_and(|neighbor| map.terrain(neighbor) == Ok(Terrain::Wall))
            });
            if narrow && rng.gen_bool(chance) {
                let _ = map.set_terrain(cell, Terrain::ClosedDoor);
            }
        }
    }
}

fn place_pools(map: &mut GridMap, rng: &mut ChaCha8Rng, rooms: &[Room], pools: u32) {
    let large: Vec<Room> = rooms
        .iter()
        .filter(|room| room.width() >= POOL_MINIMUM_ROOM && room.height() >= POOL_MINIMUM_ROOM)
        .copied()
        .collect();
    if large.is_empty() {
        return;
    }

    for _ in 0..pools {
        let room = large[rng.gen_range(0..large.len())];
        let basin = Room {
            left: room.left + 1,
            top: room.top + 1,
            right: room.right - 1,
            bottom: room.bottom - 1,
        };
        for cell in basin.cells() {
            let _ = map.set_terrain(cell, Terrain::ShallowWater);
        }
        let _ = map.set_terrain(basin.center(), Terrain::DeepWater);
    }
}

fn place_grass(map: &mut GridMap, rng: &mut ChaCha8Rng, rooms: &[Room], patches: u32) {
    if rooms.is_empty() {
        return;
    }

    for _ in 0..patches {
        let room = rooms[rng.gen_range(0..rooms.len())];
        let center = CellCoord::new(
            rng.gen_range(room.left..=room.right),
            rng.gen_range(room.top..=room.bottom),
        );

        let patch = std::iter::once(center)
            .chain(Direction::ALL.iter().filter_map(|direction| center.step(*direction)));
        for cell in patch {
            if room.contains(cell) && map.terrain(cell) == Ok(Terrain::Floor) {
                let _ = map.set_terrain(cell, Terrain::Grass);
            }
        }
    }
}

/// Picks a plain floor cell with open surroundings, or any floor cell.
fn choose_spawn(map: &GridMap, rng: &mut ChaCha8Rng) -> Option<CellCoord> {
    let floor: Vec<CellCoord> = map
        .iter()
        .filter(|(_, terrain)| *terrain == Terrain::Floor)
        .map(|(cell, _)| cell)
        .collect();

    let open: Vec<CellCoord> = floor
        .iter()
        .copied()
        .filter(|cell| {
            Direction::ALL.iter().all(|direction| {
                cell.step(*direction).is_some_and(|neighbor| {
                    matches!(map.terrain(neighbor), Ok(terrain) if terrain != Terrain::Wall)
                })
            })
        })
        .collect();

    let candidates = if open.is_empty() { floor } else { open };
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}
