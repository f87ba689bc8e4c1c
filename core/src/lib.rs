#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Delve workspace.
//!
//! This crate defines the message surface that connects input adapters, the
//! grid world, and the movement coordinator. Adapters submit [`Command`]
//! values describing player intents, the coordinator applies them against the
//! terrain grid and its derived fields, and then reports [`Event`] values that
//! presentation layers react to. Value types, configuration and error
//! categories live here so every crate agrees on them.

use std::{collections::BTreeMap, f64::consts::SQRT_2, fmt};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Delve.";

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Columns grow toward the east and rows grow toward the south.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the Chebyshev (king move) distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }

    /// Cell reached by a single step in the provided direction.
    ///
    /// Returns `None` when the step would leave the representable coordinate
    /// space. Grid bounds are not checked here.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(Self::new(column, row))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Compass directions available to actors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Diagonal movement toward decreasing rows and increasing columns.
    NorthEast,
    /// Movement toward increasing column indices.
    East,
    /// Diagonal movement toward increasing rows and columns.
    SouthEast,
    /// Movement toward increasing row indices.
    South,
    /// Diagonal movement toward increasing rows and decreasing columns.
    SouthWest,
    /// Movement toward decreasing column indices.
    West,
    /// Diagonal movement toward decreasing rows and columns.
    NorthWest,
}

impl Direction {
    /// All eight directions, clockwise from north.
    ///
    /// This order breaks ties wherever several neighbours are equally good.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The four cardinal directions, clockwise from north.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row delta applied by a step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// Reports whether the direction moves along both axes at once.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::NorthEast | Self::SouthEast | Self::SouthWest | Self::NorthWest
        )
    }

    /// The two cardinal components of a diagonal direction.
    ///
    /// Cardinal directions yield `None`.
    #[must_use]
    pub const fn components(self) -> Option<(Direction, Direction)> {
        match self {
            Self::NorthEast => Some((Self::North, Self::East)),
            Self::SouthEast => Some((Self::South, Self::East)),
            Self::SouthWest => Some((Self::South, Self::West)),
            Self::NorthWest => Some((Self::North, Self::West)),
            Self::North | Self::East | Self::South | Self::West => None,
        }
    }

    /// Direction of the single step leading from `from` to `to`.
    ///
    /// Returns `None` unless the two cells are distinct and adjacent,
    /// diagonals included.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let dx = i64::from(to.column()) - i64::from(from.column());
        let dy = i64::from(to.row()) - i64::from(from.row());
        Self::ALL.into_iter().find(|direction| {
            let (ox, oy) = direction.offset();
            i64::from(ox) == dx && i64::from(oy) == dy
        })
    }
}

/// Terrain category occupying a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Solid rock. Blocks movement and sight.
    Wall,
    /// Bare floor.
    Floor,
    /// Door that has not been opened yet. Passable, but blocks sight.
    ClosedDoor,
    /// Door that has been opened.
    OpenDoor,
    /// Tall grass.
    Grass,
    /// Wadeable water.
    ShallowWater,
    /// Water too deep to cross.
    DeepWater,
}

impl Terrain {
    /// Every terrain category in declaration order.
    pub const ALL: [Terrain; 7] = [
        Terrain::Wall,
        Terrain::Floor,
        Terrain::ClosedDoor,
        Terrain::OpenDoor,
        Terrain::Grass,
        Terrain::ShallowWater,
        Terrain::DeepWater,
    ];

    /// Glyph used when the terrain is printed as ASCII.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Floor => '.',
            Self::ClosedDoor => '+',
            Self::OpenDoor => '/',
            Self::Grass => '"',
            Self::ShallowWater => ',',
            Self::DeepWater => '~',
        }
    }

    /// Parses the glyph produced by [`Terrain::symbol`].
    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|terrain| terrain.symbol() == symbol)
    }

    /// Snake-case name used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Floor => "floor",
            Self::ClosedDoor => "closed_door",
            Self::OpenDoor => "open_door",
            Self::Grass => "grass",
            Self::ShallowWater => "shallow_water",
            Self::DeepWater => "deep_water",
        }
    }

    /// Parses the name produced by [`Terrain::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|terrain| terrain.name() == name)
    }

    /// Reports whether an actor may occupy a cell with this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Wall | Self::DeepWater)
    }

    /// Reports whether the terrain stops light and sight.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        matches!(self, Self::Wall | Self::ClosedDoor)
    }

    /// Terrain this terrain turns into when an actor enters it, if any.
    #[must_use]
    pub const fn opened(self) -> Option<Terrain> {
        match self {
            Self::ClosedDoor => Some(Self::OpenDoor),
            _ => None,
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance metric governing adjacency and step costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    /// Four-way movement; every step costs the entered cell's cost.
    #[default]
    Manhattan,
    /// Eight-way movement; diagonal steps cost the same as cardinal ones.
    Chebyshev,
    /// Eight-way movement; diagonal steps cost `sqrt(2)` times as much.
    Euclidean,
}

impl Measurement {
    /// Directions an actor may step in, clockwise from north.
    #[must_use]
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Self::Manhattan => &Direction::CARDINAL,
            Self::Chebyshev | Self::Euclidean => &Direction::ALL,
        }
    }

    /// Reports whether the metric permits stepping in the provided direction.
    #[must_use]
    pub fn allows(self, direction: Direction) -> bool {
        !direction.is_diagonal() || !matches!(self, Self::Manhattan)
    }

    /// Factor applied to the entered cell's cost for a step in `direction`.
    #[must_use]
    pub fn step_multiplier(self, direction: Direction) -> f64 {
        match self {
            Self::Euclidean if direction.is_diagonal() => SQRT_2,
            _ => 1.0,
        }
    }
}

/// Shape of the area lit around an observer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusShape {
    /// Euclidean distance; lit areas are round.
    #[default]
    Circle,
    /// Chebyshev distance; lit areas are square.
    Square,
    /// Manhattan distance; lit areas are diamonds.
    Diamond,
}

impl RadiusShape {
    /// Distance of an offset from the observer under this shape.
    #[must_use]
    pub fn distance(self, dx: i64, dy: i64) -> f64 {
        let (dx, dy) = (dx.unsigned_abs() as f64, dy.unsigned_abs() as f64);
        match self {
            Self::Circle => dx.hypot(dy),
            Self::Square => dx.max(dy),
            Self::Diamond => dx + dy,
        }
    }
}

/// Function mapping distance from the observer onto a visibility magnitude.
///
/// Every model yields `1.0` at the observer, never increases with distance
/// and yields exactly `0.0` beyond the radius.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    /// `1 - d / (radius + 1)`.
    #[default]
    Linear,
    /// `1 / (1 + d^2)`.
    InverseSquare,
    /// Full brightness everywhere inside the radius.
    Constant,
}

impl Falloff {
    /// Magnitude of a cell `distance` away from an observer seeing `radius` far.
    #[must_use]
    pub fn magnitude(self, distance: f64, radius: u32) -> f64 {
        let radius = f64::from(radius);
        if distance.is_nan() || distance > radius {
            return 0.0;
        }

        let distance = distance.max(0.0);
        match self {
            Self::Linear => 1.0 - distance / (radius + 1.0),
            Self::InverseSquare => 1.0 / (1.0 + distance * distance),
            Self::Constant => 1.0,
        }
    }
}

/// Parameters describing how far and how brightly an observer sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sight {
    /// Furthest distance, measured by `shape`, that can receive light.
    pub radius: u32,
    /// Metric used to measure distance from the observer.
    pub shape: RadiusShape,
    /// Attenuation applied with growing distance.
    pub falloff: Falloff,
}

impl Sight {
    /// Creates sight parameters with the provided radius and default shape and falloff.
    #[must_use]
    pub fn with_radius(radius: u32) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }
}

impl Default for Sight {
    fn default() -> Self {
        Self {
            radius: 8,
            shape: RadiusShape::Circle,
            falloff: Falloff::Linear,
        }
    }
}

/// Per-terrain movement costs used by distance scans.
///
/// Passable terrain costs `1.0` unless overridden. Impassable terrain is
/// always infinitely expensive; overrides never make it passable.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct CostModel {
    overrides: BTreeMap<Terrain, f64>,
}

impl CostModel {
    /// Cost model without overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override, replacing any previous cost for the terrain.
    ///
    /// Costs must be positive; `f64::INFINITY` marks the terrain as
    /// impassable for scans.
    pub fn with_override(mut self, terrain: Terrain, cost: f64) -> Result<Self, ConfigError> {
        if cost.is_nan() || cost <= 0.0 {
            return Err(ConfigError::InvalidCost { terrain, cost });
        }

        let _ = self.overrides.insert(terrain, cost);
        Ok(self)
    }

    /// Cost of entering a cell with the provided terrain.
    #[must_use]
    pub fn cost(&self, terrain: Terrain) -> f64 {
        if !terrain.is_passable() {
            return f64::INFINITY;
        }

        self.overrides.get(&terrain).copied().unwrap_or(1.0)
    }

    /// Iterator over the configured overrides in terrain order.
    pub fn overrides(&self) -> impl Iterator<Item = (Terrain, f64)> + '_ {
        self.overrides.iter().map(|(terrain, cost)| (*terrain, *cost))
    }
}

impl TryFrom<BTreeMap<String, f64>> for CostModel {
    type Error = ConfigError;

    fn try_from(entries: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        entries
            .into_iter()
            .try_fold(Self::new(), |model, (name, cost)| {
                let terrain =
                    Terrain::from_name(&name).ok_or(ConfigError::UnknownTerrain(name))?;
                model.with_override(terrain, cost)
            })
    }
}

/// Tunables consumed by the movement coordinator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// How far and how brightly the actor sees.
    pub sight: Sight,
    /// Adjacency and step cost metric for both movement and pathfinding.
    pub measurement: Measurement,
    /// Movement cost overrides for distance scans.
    pub costs: CostModel,
    /// Distances beyond this limit are left unreachable by scans.
    pub scan_limit: Option<f64>,
    /// Treats cells the actor has never seen as blocked for pathfinding.
    pub restrict_paths_to_explored: bool,
    /// Targets further than this many steps are reported as unreachable.
    pub max_path_length: Option<usize>,
}

impl CoordinatorConfig {
    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(limit) = self.scan_limit {
            if limit.is_nan() || limit <= 0.0 {
                return Err(ConfigError::InvalidScanLimit(limit));
            }
        }

        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            sight: Sight::default(),
            measurement: Measurement::Manhattan,
            costs: CostModel::new(),
            scan_limit: None,
            restrict_paths_to_explored: true,
            max_path_length: Some(250),
        }
    }
}

/// Whether the coordinator is consuming a queued path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveState {
    /// No path is queued.
    Idle,
    /// A queued path is being consumed one cell per tick.
    Following,
}

/// Commands that express every intent an input adapter may submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests a single step of the actor in the specified direction.
    RequestMove {
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Requests a path from the actor to the provided cell.
    SetTarget {
        /// Cell the actor should walk to.
        cell: CellCoord,
    },
    /// Drops any queued path without moving.
    Cancel,
    /// Advances the queued path by one cell.
    Tick,
    /// Marks every cell of the level as explored.
    RevealMap,
    /// Discards the current level and generates a new one.
    Rebuild {
        /// Seed handed to the generator; derived from the previous seed when absent.
        seed: Option<u64>,
    },
}

/// Events reported by the coordinator after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the actor moved between two adjacent cells.
    ActorMoved {
        /// Cell the actor occupied before moving.
        from: CellCoord,
        /// Cell the actor occupies after moving.
        to: CellCoord,
        /// Direction of the step.
        direction: Direction,
    },
    /// Reports that a step was refused because the destination is not enterable.
    MoveBlocked {
        /// Cell the actor remains on.
        at: CellCoord,
        /// Direction of the refused step.
        direction: Direction,
    },
    /// Reports a scripted terrain transition such as a door opening.
    TerrainChanged {
        /// Cell whose terrain changed.
        cell: CellCoord,
        /// Terrain before the change.
        from: Terrain,
        /// Terrain after the change.
        to: Terrain,
    },
    /// Confirms that the visibility field was recomputed.
    VisibilityRecomputed {
        /// Cell the field was computed from.
        observer: CellCoord,
        /// Number of cells with a non-zero magnitude.
        lit_cells: usize,
    },
    /// Confirms that the goal distance field was rescanned.
    DistanceFieldScanned {
        /// Sole goal of the scan.
        goal: CellCoord,
        /// Number of cells with a finite distance.
        reachable_cells: usize,
    },
    /// Confirms that a path toward a target was queued.
    PathQueued {
        /// Cell the path ends on.
        target: CellCoord,
        /// Number of steps in the queued path.
        length: usize,
    },
    /// Reports that no path to the target exists.
    PathUnavailable {
        /// Cell that could not be reached.
        target: CellCoord,
    },
    /// Confirms that the last queued step was taken.
    PathCompleted {
        /// Cell the actor ended on.
        at: CellCoord,
    },
    /// Confirms that a queued path was dropped on request.
    PathCancelled {
        /// Steps that were still queued.
        remaining: usize,
    },
    /// Reports that a queued path was abandoned because its next step became illegal.
    PathInterrupted {
        /// Cell the actor stopped on.
        at: CellCoord,
        /// Steps that were still queued, including the refused one.
        remaining: usize,
    },
    /// Confirms that a new level replaced the previous one.
    LevelRebuilt {
        /// Seed the level was generated from.
        seed: u64,
        /// Width of the new grid in cells.
        width: u32,
        /// Height of the new grid in cells.
        height: u32,
        /// Cell the actor was placed on.
        spawn: CellCoord,
    },
    /// Reports that the whole level was marked as explored.
    MapRevealed {
        /// Cells that had not been explored before.
        newly_explored: usize,
    },
}

/// Reports a cell coordinate outside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("cell {cell} lies outside the {width}x{height} grid")]
pub struct BoundsError {
    /// Offending coordinate.
    pub cell: CellCoord,
    /// Width of the grid that was queried.
    pub width: u32,
    /// Height of the grid that was queried.
    pub height: u32,
}

/// Derived fields that can be queried before they were computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// The per-cell visibility magnitudes.
    Visibility,
    /// The per-cell distances to the nearest goal.
    GoalDistance,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visibility => f.write_str("visibility field"),
            Self::GoalDistance => f.write_str("goal distance field"),
        }
    }
}

/// Errors raised when querying a derived field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The field was queried before its first computation.
    #[error("{0} has not been computed yet")]
    NotInitialized(FieldKind),
    /// The queried cell lies outside the field.
    #[error(transparent)]
    OutOfBounds(#[from] BoundsError),
}

/// Errors raised by invalid configuration values.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A movement cost override was zero, negative or NaN.
    #[error("cost {cost} for {terrain} must be positive")]
    InvalidCost {
        /// Terrain the override targeted.
        terrain: Terrain,
        /// Rejected cost.
        cost: f64,
    },
    /// A cost override named a terrain that does not exist.
    #[error("unknown terrain '{0}'")]
    UnknownTerrain(String),
    /// The scan limit was zero, negative or NaN.
    #[error("scan limit {0} must be positive")]
    InvalidScanLimit(f64),
}

/// Errors raised while producing a level.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The requested grid is too small to hold a level.
    #[error("a {width}x{height} grid is smaller than the {minimum}x{minimum} minimum")]
    TooSmall {
        /// Requested width in cells.
        width: u32,
        /// Requested height in cells.
        height: u32,
        /// Smallest accepted edge length.
        minimum: u32,
    },
    /// Generator settings are inconsistent.
    #[error("invalid generator settings: {0}")]
    InvalidSettings(&'static str),
    /// The level contains no cell an actor could stand on.
    #[error("generated level has no floor")]
    NoFloor,
    /// The spawn cell is outside the level or not passable.
    #[error("spawn cell {0} is outside the level or not passable")]
    InvalidSpawn(CellCoord),
}
