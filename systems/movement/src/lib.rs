#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement coordinator that walks the actor across the level.
//!
//! The coordinator owns the [`GridMap`] and both derived fields. Intents
//! arrive as method calls or [`Command`] messages, are applied one cell at a
//! time, and every observable consequence is appended to a caller-supplied
//! event buffer.

use std::collections::VecDeque;

use delve_core::{
    BoundsError, CellCoord, Command, ConfigError, CoordinatorConfig, Direction, Event,
    FieldError, GenerationError, MoveState, Terrain,
};
use delve_world::{GeneratedLevel, GoalDistanceField, GridMap, MapGenerator, VisibilityField};
use tracing::{debug, info, trace};

/// Errors surfaced by the movement coordinator.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CoordinatorError {
    /// A cell outside the level was supplied.
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    /// A derived field could not answer a query.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// The generator failed or produced an unusable level.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The coordinator configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Applies movement intents to the actor and keeps the derived fields current.
///
/// The goal distance field always has the actor as its single goal, so a
/// path to any target is read by descending the field from the target.
/// Scans are deferred while a path is being followed and resume once the
/// path completes, is interrupted, or a manual step is taken.
#[derive(Debug)]
pub struct MoveCoordinator {
    config: CoordinatorConfig,
    generator: Box<dyn MapGenerator>,
    seed: u64,
    map: GridMap,
    actor: CellCoord,
    visibility: VisibilityField,
    distances: GoalDistanceField,
    explored: Vec<bool>,
    queue: VecDeque<CellCoord>,
    distances_stale: bool,
}

impl MoveCoordinator {
    /// Generates the first level from `seed` and prepares both fields.
    pub fn new(
        config: CoordinatorConfig,
        mut generator: Box<dyn MapGenerator>,
        seed: u64,
        out_events: &mut Vec<Event>,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let level = generator.generate(seed)?;
        level.validate()?;

        let mut coordinator = Self {
            config,
            generator,
            seed,
            map: GridMap::new(0, 0, Terrain::Wall),
            actor: level.spawn,
            visibility: VisibilityField::default(),
            distances: GoalDistanceField::default(),
            explored: Vec::new(),
            queue: VecDeque::new(),
            distances_stale: true,
        };
        coordinator.install(level, seed, out_events)?;
        Ok(coordinator)
    }

    /// Dispatches a command to the matching operation.
    pub fn handle(
        &mut self,
        command: Command,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CoordinatorError> {
        match command {
            Command::RequestMove { direction } => self.request_move(direction, out_events),
            Command::SetTarget { cell } => self.set_target(cell, out_events),
            Command::Cancel => {
                self.cancel(out_events);
                Ok(())
            }
            Command::Tick => self.tick(out_events),
            Command::RevealMap => {
                self.reveal_all(out_events);
                Ok(())
            }
            Command::Rebuild { seed } => self.rebuild(seed, out_events),
        }
    }

    /// Takes a single step in the provided direction.
    ///
    /// A legal step cancels any queued path before moving. Steps into
    /// impassable terrain leave everything untouched, queued path included,
    /// apart from a [`Event::MoveBlocked`] report.
    pub fn request_move(
        &mut self,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CoordinatorError> {
        let legal = self
            .map
            .step(self.actor, direction, self.config.measurement)
            .is_some();
        if legal {
            self.cancel(out_events);
        }
        if self.step(direction, out_events)? {
            self.rescan(out_events)?;
        }
        Ok(())
    }

    /// Queues a path from the actor to `cell`.
    ///
    /// Any previously queued path is replaced. Unreachable targets, and
    /// targets further than the configured path length, clear the queue and
    /// report [`Event::PathUnavailable`].
    pub fn set_target(
        &mut self,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CoordinatorError> {
        let _ = self.map.index(cell)?;
        if cell == self.actor {
            self.cancel(out_events);
            return Ok(());
        }

        if self.distances_stale {
            self.rescan(out_events)?;
        }

        let max_steps = self.config.max_path_length.unwrap_or(usize::MAX);
        let toward_actor = self.distances.find_path_within(cell, max_steps)?;
        self.queue.clear();

        if toward_actor.is_empty() {
            debug!(target = %cell, "no path to target");
            out_events.push(Event::PathUnavailable { target: cell });
            return Ok(());
        }

        self.queue.extend(toward_actor.iter().rev().skip(1).copied());
        self.queue.push_back(cell);
        debug!(target = %cell, length = self.queue.len(), "path queued");
        out_events.push(Event::PathQueued {
            target: cell,
            length: self.queue.len(),
        });
        Ok(())
    }

    /// Drops the queued path without moving.
    pub fn cancel(&mut self, out_events: &mut Vec<Event>) {
        if self.queue.is_empty() {
            return;
        }

        let remaining = self.queue.len();
        self.queue.clear();
        debug!(remaining, "path cancelled");
        out_events.push(Event::PathCancelled { remaining });
    }

    /// Advances the queued path by one cell; does nothing while idle.
    pub fn tick(&mut self, out_events: &mut Vec<Event>) -> Result<(), CoordinatorError> {
        let Some(next) = self.queue.pop_front() else {
            return Ok(());
        };

        let at = self.actor;
        let measurement = self.config.measurement;
        let direction = Direction::between(at, next)
            .filter(|direction| self.map.step(at, *direction, measurement) == Some(next));
        let Some(direction) = direction else {
            let remaining = self.queue.len() + 1;
            self.queue.clear();
            debug!(%at, %next, remaining, "path interrupted");
            out_events.push(Event::PathInterrupted { at, remaining });
            return self.rescan(out_events);
        };

        let _ = self.step(direction, out_events)?;
        if self.queue.is_empty() {
            out_events.push(Event::PathCompleted { at: self.actor });
            self.rescan(out_events)?;
        }
        Ok(())
    }

    /// Marks every cell as explored.
    ///
    /// When paths are restricted to explored cells the distance field goes
    /// stale, so the next target is planned over the whole level.
    pub fn reveal_all(&mut self, out_events: &mut Vec<Event>) {
        let newly_explored = self.explored.iter().filter(|explored| !**explored).count();
        self.explored.fill(true);
        if self.config.restrict_paths_to_explored && newly_explored > 0 {
            self.distances_stale = true;
        }

        debug!(newly_explored, "level revealed");
        out_events.push(Event::MapRevealed { newly_explored });
    }

    /// Replaces the level with one generated from `seed`.
    ///
    /// Without a seed the next one is derived from the current seed. A failed
    /// generation leaves the current level in place.
    pub fn rebuild(
        &mut self,
        seed: Option<u64>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CoordinatorError> {
        let seed = seed.unwrap_or_else(|| next_seed(self.seed));
        let level = self.generator.generate(seed)?;
        level.validate()?;
        self.install(level, seed, out_events)
    }

    /// Reports whether a path is being followed.
    #[must_use]
    pub fn state(&self) -> MoveState {
        if self.queue.is_empty() {
            MoveState::Idle
        } else {
            MoveState::Following
        }
    }

    /// Cell the actor occupies.
    #[must_use]
    pub const fn actor(&self) -> CellCoord {
        self.actor
    }

    /// Terrain of the current level.
    #[must_use]
    pub const fn map(&self) -> &GridMap {
        &self.map
    }

    /// Visibility computed from the actor's cell.
    #[must_use]
    pub const fn visibility(&self) -> &VisibilityField {
        &self.visibility
    }

    /// Distances to the actor as of the most recent scan.
    #[must_use]
    pub const fn distances(&self) -> &GoalDistanceField {
        &self.distances
    }

    /// Cells still queued, in walking order.
    pub fn queued_path(&self) -> impl ExactSizeIterator<Item = CellCoord> + '_ {
        self.queue.iter().copied()
    }

    /// Reports whether the cell has been lit since the level was built.
    pub fn is_explored(&self, cell: CellCoord) -> Result<bool, BoundsError> {
        let index = self.map.index(cell)?;
        Ok(self.explored[index])
    }

    /// Seed the current level was generated from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Configuration the coordinator runs with.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn install(
        &mut self,
        level: GeneratedLevel,
        seed: u64,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CoordinatorError> {
        let GeneratedLevel { map, spawn } = level;
        let (width, height) = map.dimensions();

        self.explored = vec![false; map.cells().len()];
        self.map = map;
        self.actor = spawn;
        self.seed = seed;
        self.queue.clear();
        self.visibility = VisibilityField::default();
        self.distances = GoalDistanceField::default();
        self.distances_stale = true;

        info!(seed, width, height, %spawn, "level rebuilt");
        out_events.push(Event::LevelRebuilt {
            seed,
            width,
            height,
            spawn,
        });

        self.refresh_visibility(out_events)?;
        self.rescan(out_events)
    }

    /// Moves the actor one legal step, opening doors it walks into.
    ///
    /// Returns `false` when the step was refused.
    fn step(
        &mut self,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) -> Result<bool, CoordinatorError> {
        let from = self.actor;
        let Some(to) = self.map.step(from, direction, self.config.measurement) else {
            trace!(%from, ?direction, "move blocked");
            out_events.push(Event::MoveBlocked {
                at: from,
                direction,
            });
            return Ok(false);
        };

        self.actor = to;
        self.distances_stale = true;
        debug!(%from, %to, ?direction, "actor moved");
        out_events.push(Event::ActorMoved {
            from,
            to,
            direction,
        });
        self.refresh_visibility(out_events)?;

        let terrain = self.map.terrain(to)?;
        if let Some(opened) = terrain.opened() {
            let _ = self.map.set_terrain(to, opened)?;
            debug!(cell = %to, "door opened");
            out_events.push(Event::TerrainChanged {
                cell: to,
                from: terrain,
                to: opened,
            });
            self.refresh_visibility(out_events)?;
        }

        Ok(true)
    }

    fn refresh_visibility(&mut self, out_events: &mut Vec<Event>) -> Result<(), CoordinatorError> {
        self.visibility.compute(&self.map, self.actor, self.config.sight)?;

        for (explored, magnitude) in self
            .explored
            .iter_mut()
            .zip(self.visibility.magnitudes())
        {
            if *magnitude > 0.0 {
                *explored = true;
            }
        }

        out_events.push(Event::VisibilityRecomputed {
            observer: self.actor,
            lit_cells: self.visibility.lit_count(),
        });
        Ok(())
    }

    fn rescan(&mut self, out_events: &mut Vec<Event>) -> Result<(), CoordinatorError> {
        let map = &self.map;
        let explored = &self.explored;
        let restrict = self.config.restrict_paths_to_explored;
        self.distances.scan_with(
            map,
            &[self.actor],
            &self.config.costs,
            self.config.measurement,
            self.config.scan_limit,
            |cell| restrict && !map.index(cell).is_ok_and(|index| explored[index]),
        )?;
        self.distances_stale = false;

        let reachable_cells = self.distances.reachable_count();
        debug!(goal = %self.actor, reachable_cells, "distance field scanned");
        out_events.push(Event::DistanceFieldScanned {
            goal: self.actor,
            reachable_cells,
        });
        Ok(())
    }
}

/// Derives the seed of the next level with a SplitMix64 step.
#[must_use]
pub fn next_seed(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
