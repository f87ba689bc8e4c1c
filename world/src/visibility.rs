//! Field of view and lighting computed from a single observer.

use delve_core::{BoundsError, CellCoord, FieldError, FieldKind, Sight};

use crate::{offset, GridMap};

/// Dense per-cell visibility magnitudes in `[0, 1]`.
///
/// The field is disposable: every [`VisibilityField::compute`] call discards
/// the previous result. Sight lines are resolved with symmetric shadow
/// casting, so a cell is lit exactly when the observer would be lit from it,
/// and every cell behind an opaque cell on a ray stays dark. Opaque cells
/// bounding the visible area are themselves lit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibilityField {
    width: u32,
    height: u32,
    observer: Option<CellCoord>,
    magnitudes: Vec<f64>,
}

impl VisibilityField {
    /// Recomputes the field for `observer` on `map`.
    pub fn compute(
        &mut self,
        map: &GridMap,
        observer: CellCoord,
        sight: Sight,
    ) -> Result<(), BoundsError> {
        let observer_index = map.index(observer)?;
        let cell_count = map.cells().len();

        if self.magnitudes.len() != cell_count {
            self.magnitudes = vec![0.0; cell_count];
        } else {
            self.magnitudes.fill(0.0);
        }

        self.width = map.width();
        self.height = map.height();
        self.observer = Some(observer);
        self.magnitudes[observer_index] = sight.falloff.magnitude(0.0, sight.radius);

        let mut caster = ShadowCaster {
            map,
            origin: observer,
            sight,
            magnitudes: &mut self.magnitudes,
        };
        for quadrant in Quadrant::ALL {
            caster.cast(quadrant);
        }

        tracing::trace!(%observer, radius = sight.radius, "visibility recomputed");
        Ok(())
    }

    /// Visibility magnitude of the cell; `0.0` means unseen.
    pub fn magnitude(&self, cell: CellCoord) -> Result<f64, FieldError> {
        let index = self.index(cell)?;
        Ok(self.magnitudes[index])
    }

    /// Reports whether the cell received any light.
    pub fn is_visible(&self, cell: CellCoord) -> Result<bool, FieldError> {
        self.magnitude(cell).map(|magnitude| magnitude > 0.0)
    }

    /// Cell the field was last computed from.
    #[must_use]
    pub const fn observer(&self) -> Option<CellCoord> {
        self.observer
    }

    /// Reports whether the field has been computed at least once.
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        self.observer.is_some()
    }

    /// Cells with a non-zero magnitude in row-major order.
    pub fn lit_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let width = usize::try_from(self.width).unwrap_or(0).max(1);
        self.magnitudes
            .iter()
            .enumerate()
            .filter(|(_, magnitude)| **magnitude > 0.0)
            .filter_map(move |(index, _)| {
                let column = u32::try_from(index % width).ok()?;
                let row = u32::try_from(index / width).ok()?;
                Some(CellCoord::new(column, row))
            })
    }

    /// Number of cells with a non-zero magnitude.
    #[must_use]
    pub fn lit_count(&self) -> usize {
        self.magnitudes
            .iter()
            .filter(|magnitude| **magnitude > 0.0)
            .count()
    }

    /// Dense magnitudes stored in row-major order.
    #[must_use]
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    fn index(&self, cell: CellCoord) -> Result<usize, FieldError> {
        if self.observer.is_none() {
            return Err(FieldError::NotInitialized(FieldKind::Visibility));
        }

        Ok(offset(self.width, self.height, cell)?)
    }
}

struct ShadowCaster<'a> {
    map: &'a GridMap,
    origin: CellCoord,
    sight: Sight,
    magnitudes: &'a mut [f64],
}

impl ShadowCaster<'_> {
    fn cast(&mut self, quadrant: Quadrant) {
        let max_depth = i64::from(self.sight.radius);
        let mut rows = vec![Row {
            depth: 1,
            start: Slope::new(-1, 1),
            end: Slope::new(1, 1),
        }];

        while let Some(mut row) = rows.pop() {
            if row.depth > max_depth {
                continue;
            }

            let mut previous_opaque = None;
            for column in row.min_column()..=row.max_column() {
                let cell = quadrant.transform(self.origin, row.depth, column);
                let opaque = cell.map_or(true, |cell| self.map.is_opaque(cell).unwrap_or(true));

                if opaque || row.is_symmetric(column) {
                    if let Some(cell) = cell {
                        self.reveal(cell);
                    }
                }

                match previous_opaque {
                    Some(true) if !opaque => row.start = Slope::of_tile(row.depth, column),
                    Some(false) if opaque => {
                        let mut next = row.next();
                        next.end = Slope::of_tile(row.depth, column);
                        rows.push(next);
                    }
                    _ => {}
                }
                previous_opaque = Some(opaque);
            }

            if previous_opaque == Some(false) {
                rows.push(row.next());
            }
        }
    }

    fn reveal(&mut self, cell: CellCoord) {
        let Ok(index) = self.map.index(cell) else {
            return;
        };

        let dx = i64::from(cell.column()) - i64::from(self.origin.column());
        let dy = i64::from(cell.row()) - i64::from(self.origin.row());
        let distance = self.sight.shape.distance(dx, dy);
        let magnitude = self.sight.falloff.magnitude(distance, self.sight.radius);
        let slot = &mut self.magnitudes[index];
        if magnitude > *slot {
            *slot = magnitude;
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Quadrant {
    North,
    East,
    South,
    West,
}

impl Quadrant {
    const ALL: [Quadrant; 4] = [
        Quadrant::North,
        Quadrant::East,
        Quadrant::South,
        Quadrant::West,
    ];

    fn transform(self, origin: CellCoord, depth: i64, column: i64) -> Option<CellCoord> {
        let x = i64::from(origin.column());
        let y = i64::from(origin.row());
        let (x, y) = match self {
            Self::North => (x + column, y - depth),
            Self::South => (x + column, y + depth),
            Self::East => (x + depth, y + column),
            Self::West => (x - depth, y + column),
        };
        let column = u32::try_from(x).ok()?;
        let row = u32::try_from(y).ok()?;
        Some(CellCoord::new(column, row))
    }
}

/// Exact rational slope `rise / run` with a positive run.
#[derive(Clone, Copy, Debug)]
struct Slope {
    rise: i64,
    run: i64,
}

impl Slope {
    const fn new(rise: i64, run: i64) -> Self {
        Self { rise, run }
    }

    /// Slope through the near edge of the tile at `column` on row `depth`.
    const fn of_tile(depth: i64, column: i64) -> Self {
        Self::new(2 * column - 1, 2 * depth)
    }
}

#[derive(Clone, Copy, Debug)]
struct Row {
    depth: i64,
    start: Slope,
    end: Slope,
}

impl Row {
    /// `round_ties_up(depth * start)`.
    fn min_column(&self) -> i64 {
        let numerator = 2 * self.depth * self.start.rise + self.start.run;
        numerator.div_euclid(2 * self.start.run)
    }

    /// `round_ties_down(depth * end)`.
    fn max_column(&self) -> i64 {
        let numerator = 2 * self.depth * self.end.rise - self.end.run;
        -(-numerator).div_euclid(2 * self.end.run)
    }

    fn is_symmetric(&self, column: i64) -> bool {
        column * self.start.run >= self.depth * self.start.rise
            && column * self.end.run <= self.depth * self.end.rise
    }

    fn next(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..*self
        }
    }
}
