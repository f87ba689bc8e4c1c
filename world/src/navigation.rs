//! Goal distance field ("Dijkstra map") built over the passable grid.

use std::{cmp::Ordering, collections::BinaryHeap};

use delve_core::{
    BoundsError, CellCoord, CostModel, Direction, FieldError, FieldKind, Measurement,
};

use crate::{offset, GridMap};

/// Dense accumulated movement cost from every cell to the nearest goal.
///
/// Goals hold `0.0`; cells no goal can reach hold `f64::INFINITY`. The legal
/// moves out of every reached cell are captured during the scan so path
/// descent never consults the map again.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GoalDistanceField {
    width: u32,
    height: u32,
    measurement: Measurement,
    goals: Vec<CellCoord>,
    distances: Vec<f64>,
    moves: Vec<u8>,
    scanned: bool,
}

impl GoalDistanceField {
    /// Rebuilds the distances for `goals` under the provided costs and metric.
    pub fn scan(
        &mut self,
        map: &GridMap,
        goals: &[CellCoord],
        costs: &CostModel,
        measurement: Measurement,
    ) -> Result<(), BoundsError> {
        self.scan_with(map, goals, costs, measurement, None, |_| false)
    }

    /// Rebuilds the distances, ignoring cells rejected by `is_blocked` and
    /// leaving cells costlier than `limit` unreached.
    ///
    /// Goals outside the map fail the whole scan and leave the previous
    /// result untouched. Goals on impassable or blocked cells are skipped.
    pub fn scan_with<F>(
        &mut self,
        map: &GridMap,
        goals: &[CellCoord],
        costs: &CostModel,
        measurement: Measurement,
        limit: Option<f64>,
        mut is_blocked: F,
    ) -> Result<(), BoundsError>
    where
        F: FnMut(CellCoord) -> bool,
    {
        let seeds = goals
            .iter()
            .map(|&goal| map.index(goal).map(|index| (goal, index)))
            .collect::<Result<Vec<_>, _>>()?;

        let cell_count = map.cells().len();
        if self.distances.len() != cell_count {
            self.distances = vec![f64::INFINITY; cell_count];
            self.moves = vec![0; cell_count];
        } else {
            self.distances.fill(f64::INFINITY);
            self.moves.fill(0);
        }

        self.width = map.width();
        self.height = map.height();
        self.measurement = measurement;
        self.goals = goals.to_vec();
        self.scanned = true;

        let mut frontier = BinaryHeap::new();
        for (goal, index) in seeds {
            if !map.cells()[index].is_passable() || is_blocked(goal) {
                continue;
            }

            if self.distances[index] == 0.0 {
                continue;
            }

            self.distances[index] = 0.0;
            frontier.push(Frontier {
                distance: 0.0,
                index,
            });
        }

        while let Some(Frontier { distance, index }) = frontier.pop() {
            if distance > self.distances[index] {
                continue;
            }

            let Some(cell) = map.cell_at(index) else {
                continue;
            };

            let mut legal_moves = 0;
            for &direction in measurement.directions() {
                let Some(neighbor) = map.step(cell, direction, measurement) else {
                    continue;
                };
                if is_blocked(neighbor) {
                    continue;
                }
                legal_moves |= direction_bit(direction);

                let Ok(neighbor_index) = map.index(neighbor) else {
                    continue;
                };
                let entered = map.cells()[neighbor_index];
                let step_cost = costs.cost(entered) * measurement.step_multiplier(direction);
                let candidate = distance + step_cost;
                if !candidate.is_finite() || limit.is_some_and(|limit| candidate > limit) {
                    continue;
                }

                if candidate < self.distances[neighbor_index] {
                    self.distances[neighbor_index] = candidate;
                    frontier.push(Frontier {
                        distance: candidate,
                        index: neighbor_index,
                    });
                }
            }
            self.moves[index] = legal_moves;
        }

        tracing::trace!(
            goals = self.goals.len(),
            reachable = self.reachable_count(),
            "goal distance field scanned"
        );
        Ok(())
    }

    /// Accumulated cost from the cell to the nearest goal.
    pub fn distance(&self, cell: CellCoord) -> Result<f64, FieldError> {
        let index = self.index(cell)?;
        Ok(self.distances[index])
    }

    /// Reports whether any goal can be reached from the cell.
    pub fn is_reachable(&self, cell: CellCoord) -> Result<bool, FieldError> {
        self.distance(cell).map(f64::is_finite)
    }

    /// Descends the field from `source` towards the nearest goal.
    ///
    /// The returned cells exclude `source` and end on a goal. Each step moves
    /// to the legal neighbour with the smallest strictly lower distance, ties
    /// resolved clockwise from north. The path is empty when `source` is a
    /// goal, cannot reach one, or the descent stalls.
    pub fn find_path(&self, source: CellCoord) -> Result<Vec<CellCoord>, FieldError> {
        self.find_path_within(source, usize::MAX)
    }

    /// Same as [`GoalDistanceField::find_path`], but yields an empty path
    /// when more than `max_steps` cells would be needed.
    pub fn find_path_within(
        &self,
        source: CellCoord,
        max_steps: usize,
    ) -> Result<Vec<CellCoord>, FieldError> {
        let mut index = self.index(source)?;
        let mut distance = self.distances[index];
        let mut path = Vec::new();
        if !distance.is_finite() {
            return Ok(path);
        }

        let mut current = source;
        while distance > 0.0 {
            if path.len() >= max_steps {
                return Ok(Vec::new());
            }

            let mut best: Option<(CellCoord, usize, f64)> = None;
            for &direction in self.measurement.directions() {
                if self.moves[index] & direction_bit(direction) == 0 {
                    continue;
                }
                let Some(neighbor) = current.step(direction) else {
                    continue;
                };
                let Ok(neighbor_index) = offset(self.width, self.height, neighbor) else {
                    continue;
                };

                let candidate = self.distances[neighbor_index];
                let threshold = best.map_or(distance, |(_, _, best_distance)| best_distance);
                if candidate < threshold {
                    best = Some((neighbor, neighbor_index, candidate));
                }
            }

            let Some((next, next_index, next_distance)) = best else {
                return Ok(Vec::new());
            };
            path.push(next);
            current = next;
            index = next_index;
            distance = next_distance;
        }

        Ok(path)
    }

    /// Goals supplied to the most recent scan.
    #[must_use]
    pub fn goals(&self) -> &[CellCoord] {
        &self.goals
    }

    /// Metric used by the most recent scan.
    #[must_use]
    pub const fn measurement(&self) -> Measurement {
        self.measurement
    }

    /// Reports whether the field has been scanned at least once.
    #[must_use]
    pub const fn is_scanned(&self) -> bool {
        self.scanned
    }

    /// Number of cells holding a finite distance.
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|distance| distance.is_finite()).count()
    }

    /// Dense distances stored in row-major order.
    #[must_use]
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    fn index(&self, cell: CellCoord) -> Result<usize, FieldError> {
        if !self.scanned {
            return Err(FieldError::NotInitialized(FieldKind::GoalDistance));
        }

        Ok(offset(self.width, self.height, cell)?)
    }
}

fn direction_bit(direction: Direction) -> u8 {
    1 << direction as u8
}

/// Min-heap entry ordered by distance, then by row-major index.
#[derive(Clone, Copy, Debug)]
struct Frontier {
    distance: f64,
    index: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
