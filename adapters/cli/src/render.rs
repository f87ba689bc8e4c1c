//! ASCII presentation of the coordinator state.

use std::fmt::Write as _;

use delve_core::{CellCoord, Direction, Event, MoveState};
use delve_system_movement::MoveCoordinator;

const ACTOR: char = '@';
const PATH: char = '*';
const UNEXPLORED: char = ' ';

/// Draws the level as the actor knows it.
///
/// Explored terrain is drawn by symbol, unexplored cells are blank, and the
/// queued path is overlaid with `*`.
#[must_use]
pub(crate) fn frame(coordinator: &MoveCoordinator) -> String {
    let map = coordinator.map();
    let path: Vec<CellCoord> = coordinator.queued_path().collect();
    let mut frame = String::new();

    for (cell, terrain) in map.iter() {
        if cell.column() == 0 && cell.row() > 0 {
            frame.push('\n');
        }

        let symbol = if cell == coordinator.actor() {
            ACTOR
        } else if path.contains(&cell) {
            PATH
        } else if coordinator.is_explored(cell).unwrap_or(false) {
            terrain.symbol()
        } else {
            UNEXPLORED
        };
        frame.push(symbol);
    }
    frame
}

/// One-line summary of the session.
#[must_use]
pub(crate) fn status_line(coordinator: &MoveCoordinator) -> String {
    let state = match coordinator.state() {
        MoveState::Idle => "idle",
        MoveState::Following => "walking",
    };
    let actor = coordinator.actor();
    let terrain = coordinator
        .map()
        .terrain(actor)
        .map_or_else(|_| "unknown".to_owned(), |terrain| terrain.to_string());

    let mut line = format!(
        "seed {} | at {actor} on {terrain} | {state}",
        coordinator.seed()
    );
    let remaining = coordinator.queued_path().len();
    if remaining > 0 {
        let _ = write!(line, " | {remaining} steps left");
    }
    line
}

/// Player-facing description of an event, if it deserves one.
#[must_use]
pub(crate) fn describe(event: &Event) -> Option<String> {
    let message = match event {
        Event::MoveBlocked { direction, .. } => {
            format!("Something blocks the way {}.", direction_name(*direction))
        }
        Event::TerrainChanged { cell, to, .. } => format!("The cell at {cell} becomes {to}."),
        Event::PathQueued { target, length } => format!("Walking to {target}: {length} steps."),
        Event::PathUnavailable { target } => format!("No known path to {target}."),
        Event::PathCompleted { at } => format!("Arrived at {at}."),
        Event::PathCancelled { remaining } => {
            format!("Stopped with {remaining} steps to go.")
        }
        Event::PathInterrupted { at, .. } => format!("The way is blocked at {at}."),
        Event::LevelRebuilt {
            seed,
            width,
            height,
            ..
        } => format!("A new {width}x{height} level rises from seed {seed}."),
        Event::MapRevealed { newly_explored } => {
            format!("The whole level is revealed ({newly_explored} new cells).")
        }
        Event::ActorMoved { .. }
        | Event::VisibilityRecomputed { .. }
        | Event::DistanceFieldScanned { .. } => return None,
    };
    Some(message)
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::North => "north",
        Direction::NorthEast => "north-east",
        Direction::East => "east",
        Direction::SouthEast => "south-east",
        Direction::South => "south",
        Direction::SouthWest => "south-west",
        Direction::West => "west",
        Direction::NorthWest => "north-west",
    }
}
