#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level state for Delve: the terrain grid and the fields derived from it.
//!
//! [`GridMap`] is the only owned description of the level. The
//! [`VisibilityField`] and [`GoalDistanceField`] are disposable projections of
//! it that are rebuilt whenever the observer or the goals move. Levels come
//! from a [`MapGenerator`], which receives an explicit seed for every call.

mod grid;
mod navigation;
mod visibility;

use std::fmt;

use delve_core::{BoundsError, CellCoord, GenerationError, Terrain};

pub use grid::{GridMap, ParseError};
pub use navigation::GoalDistanceField;
pub use visibility::VisibilityField;

const SPAWN_MARKER: char = '@';

/// External routine producing playable levels.
pub trait MapGenerator: fmt::Debug {
    /// Produces a level from the provided seed.
    ///
    /// Implementations must be deterministic: the same seed yields the same
    /// level.
    fn generate(&mut self, seed: u64) -> Result<GeneratedLevel, GenerationError>;
}

/// Terrain grid paired with the cell the actor starts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedLevel {
    /// Terrain of the level.
    pub map: GridMap,
    /// Starting cell of the actor.
    pub spawn: CellCoord,
}

impl GeneratedLevel {
    /// Parses a layout in which `@` marks the spawn on a floor cell.
    pub fn from_ascii(text: &str) -> Result<Self, ParseError> {
        let mut spawn = None;
        let mut rows = Vec::new();
        for (row, line) in text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
        {
            if let Some(column) = line.chars().position(|symbol| symbol == SPAWN_MARKER) {
                if spawn.is_some() || line.matches(SPAWN_MARKER).count() > 1 {
                    return Err(ParseError::MultipleSpawns);
                }
                let column = u32::try_from(column).map_err(|_| ParseError::TooLarge)?;
                let row = u32::try_from(row).map_err(|_| ParseError::TooLarge)?;
                spawn = Some(CellCoord::new(column, row));
            }
            rows.push(line.replace(SPAWN_MARKER, &Terrain::Floor.symbol().to_string()));
        }

        let spawn = spawn.ok_or(ParseError::MissingSpawn)?;
        let map = GridMap::from_ascii(&rows.join("\n"))?;
        Ok(Self { map, spawn })
    }

    /// Confirms the spawn lies on a passable cell of the map.
    pub fn validate(&self) -> Result<(), GenerationError> {
        match self.map.is_passable(self.spawn) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(GenerationError::InvalidSpawn(self.spawn)),
        }
    }
}

/// Generator returning the same pre-built level for every seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticLayout {
    level: GeneratedLevel,
}

impl StaticLayout {
    /// Wraps a pre-built level.
    #[must_use]
    pub const fn new(level: GeneratedLevel) -> Self {
        Self { level }
    }

    /// Level handed out by the generator.
    #[must_use]
    pub const fn level(&self) -> &GeneratedLevel {
        &self.level
    }
}

impl MapGenerator for StaticLayout {
    fn generate(&mut self, _seed: u64) -> Result<GeneratedLevel, GenerationError> {
        Ok(self.level.clone())
    }
}

/// Row-major offset of `cell` inside a `width` by `height` grid.
pub(crate) fn offset(width: u32, height: u32, cell: CellCoord) -> Result<usize, BoundsError> {
    let out_of_bounds = BoundsError {
        cell,
        width,
        height,
    };
    if cell.column() >= width || cell.row() >= height {
        return Err(out_of_bounds);
    }

    let row = usize::try_from(cell.row()).map_err(|_| out_of_bounds)?;
    let column = usize::try_from(cell.column()).map_err(|_| out_of_bounds)?;
    let width = usize::try_from(width).map_err(|_| out_of_bounds)?;
    Ok(row * width + column)
}
