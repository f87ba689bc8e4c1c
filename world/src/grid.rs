//! Dense terrain grid describing the level.

use std::fmt;

use delve_core::{BoundsError, CellCoord, Direction, Measurement, Terrain};

use crate::offset;

/// Row-major grid of terrain with dimensions fixed at construction.
///
/// Every cell holds exactly one [`Terrain`]. Accessors refuse coordinates
/// outside `[0, width) x [0, height)` with a [`BoundsError`] instead of
/// clamping them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridMap {
    width: u32,
    height: u32,
    cells: Vec<Terrain>,
}

impl GridMap {
    /// Creates a grid with every cell set to `fill`.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: Terrain) -> Self {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![fill; capacity],
        }
    }

    /// Parses a grid from rows of terrain symbols.
    ///
    /// Blank lines and surrounding whitespace are ignored so layouts can be
    /// written as indented string literals.
    pub fn from_ascii(text: &str) -> Result<Self, ParseError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(ParseError::Empty);
        };

        let width = first.chars().count();
        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(ParseError::Ragged {
                    row,
                    expected: width,
                    found,
                });
            }

            for (column, symbol) in line.chars().enumerate() {
                let terrain = Terrain::from_symbol(symbol).ok_or(ParseError::UnknownSymbol {
                    symbol,
                    column,
                    row,
                })?;
                cells.push(terrain);
            }
        }

        let width = u32::try_from(width).map_err(|_| ParseError::TooLarge)?;
        let height = u32::try_from(rows.len()).map_err(|_| ParseError::TooLarge)?;
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Width of the grid in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the grid in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height of the grid in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Row-major offset of the cell.
    pub fn index(&self, cell: CellCoord) -> Result<usize, BoundsError> {
        offset(self.width, self.height, cell)
    }

    /// Coordinate of the cell stored at a row-major offset.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<CellCoord> {
        if index >= self.cells.len() {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(CellCoord::new(column, row))
    }

    /// Terrain occupying the cell.
    pub fn terrain(&self, cell: CellCoord) -> Result<Terrain, BoundsError> {
        let index = self.index(cell)?;
        Ok(self.cells[index])
    }

    /// Reports whether an actor may occupy the cell.
    pub fn is_passable(&self, cell: CellCoord) -> Result<bool, BoundsError> {
        self.terrain(cell).map(Terrain::is_passable)
    }

    /// Reports whether the cell stops sight.
    pub fn is_opaque(&self, cell: CellCoord) -> Result<bool, BoundsError> {
        self.terrain(cell).map(Terrain::is_opaque)
    }

    /// Replaces the terrain of a cell, returning the terrain it held before.
    pub fn set_terrain(
        &mut self,
        cell: CellCoord,
        terrain: Terrain,
    ) -> Result<Terrain, BoundsError> {
        let index = self.index(cell)?;
        Ok(std::mem::replace(&mut self.cells[index], terrain))
    }

    /// Destination of a legal single step, if the step is legal.
    ///
    /// A step is legal when the metric allows its direction, the destination
    /// lies inside the grid and is passable, and a diagonal step does not cut
    /// past an impassable corner.
    #[must_use]
    pub fn step(
        &self,
        from: CellCoord,
        direction: Direction,
        measurement: Measurement,
    ) -> Option<CellCoord> {
        if !measurement.allows(direction) {
            return None;
        }

        let to = from.step(direction)?;
        if !self.passable_at(to) {
            return None;
        }

        if let Some((vertical, horizontal)) = direction.components() {
            let clear =
                |side: Direction| from.step(side).is_some_and(|cell| self.passable_at(cell));
            if !clear(vertical) || !clear(horizontal) {
                return None;
            }
        }

        Some(to)
    }

    /// Dense terrain stored in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Terrain] {
        &self.cells
    }

    /// Iterator over every cell and its terrain in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Terrain)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, terrain)| self.cell_at(index).map(|cell| (cell, *terrain)))
    }

    /// Renders the grid as rows of terrain symbols separated by newlines.
    #[must_use]
    pub fn to_ascii(&self) -> String {
        self.to_string()
    }

    fn passable_at(&self, cell: CellCoord) -> bool {
        self.terrain(cell).map_or(false, Terrain::is_passable)
    }
}

impl fmt::Display for GridMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = usize::try_from(self.width).map_err(|_| fmt::Error)?;
        if width == 0 {
            return Ok(());
        }

        for (index, row) in self.cells.chunks(width).enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for terrain in row {
                write!(f, "{}", terrain.symbol())?;
            }
        }
        Ok(())
    }
}

/// Errors raised while parsing an ASCII layout.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The layout contained no rows.
    #[error("layout is empty")]
    Empty,
    /// A row's length differs from the first row's.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Zero-based index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A character does not name any terrain.
    #[error("unknown terrain symbol '{symbol}' at ({column}, {row})")]
    UnknownSymbol {
        /// Offending character.
        symbol: char,
        /// Zero-based column of the character.
        column: usize,
        /// Zero-based row of the character.
        row: usize,
    },
    /// The layout does not fit the coordinate space.
    #[error("layout exceeds the supported grid size")]
    TooLarge,
    /// A level layout did not mark a spawn cell with `@`.
    #[error("layout has no spawn marker '@'")]
    MissingSpawn,
    /// A level layout marked more than one spawn cell.
    #[error("layout has more than one spawn marker '@'")]
    MultipleSpawns,
}
