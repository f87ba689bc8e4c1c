use delve_core::{
    CellCoord, Command, CoordinatorConfig, Direction, Event, GenerationError, Measurement,
    MoveState, Terrain,
};
use delve_system_movement::{next_seed, CoordinatorError, MoveCoordinator};
use delve_world::{GeneratedLevel, GridMap, MapGenerator, StaticLayout};

const ROOM: &str = "
    #######
    #.....#
    #.@...#
    #.....#
    #######
";

const DOORWAY: &str = "
    #######
    #.@+..#
    #######
";

fn coordinator(layout: &str, config: CoordinatorConfig) -> MoveCoordinator {
    let level = GeneratedLevel::from_ascii(layout).expect("valid level");
    let mut events = Vec::new();
    MoveCoordinator::new(config, Box::new(StaticLayout::new(level)), 1, &mut events)
        .expect("coordinator starts")
}

fn unrestricted() -> CoordinatorConfig {
    CoordinatorConfig {
        restrict_paths_to_explored: false,
        ..CoordinatorConfig::default()
    }
}

fn scan_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::DistanceFieldScanned { .. }))
        .count()
}

#[test]
fn construction_builds_the_level_then_both_fields() {
    let level = GeneratedLevel::from_ascii(ROOM).expect("valid level");
    let mut events = Vec::new();
    let coordinator = MoveCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(StaticLayout::new(level)),
        42,
        &mut events,
    )
    .expect("coordinator starts");

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        Event::LevelRebuilt {
            seed: 42,
            width: 7,
            height: 5,
            spawn: CellCoord::new(2, 2),
        }
    );
    assert!(matches!(
        events[1],
        Event::VisibilityRecomputed {
            observer,
            ..
        } if observer == CellCoord::new(2, 2)
    ));
    assert!(matches!(
        events[2],
        Event::DistanceFieldScanned {
            goal,
            reachable_cells: 15,
        } if goal == CellCoord::new(2, 2)
    ));
    assert_eq!(coordinator.state(), MoveState::Idle);
    assert_eq!(coordinator.seed(), 42);
    assert_eq!(coordinator.is_explored(CellCoord::new(5, 3)), Ok(true));
}

#[test]
fn blocked_move_changes_nothing() {
    let mut coordinator = coordinator(
        "
        #####
        #.@##
        #####
        ",
        CoordinatorConfig::default(),
    );
    let distances_before = coordinator.distances().clone();
    let visibility_before = coordinator.visibility().clone();

    let mut events = Vec::new();
    coordinator
        .request_move(Direction::East, &mut events)
        .expect("blocked moves are not errors");

    assert_eq!(
        events,
        vec![Event::MoveBlocked {
            at: CellCoord::new(2, 1),
            direction: Direction::East,
        }]
    );
    assert_eq!(coordinator.actor(), CellCoord::new(2, 1));
    assert_eq!(coordinator.state(), MoveState::Idle);
    assert_eq!(coordinator.distances(), &distances_before);
    assert_eq!(coordinator.visibility(), &visibility_before);
}

#[test]
fn diagonal_requests_are_blocked_under_manhattan_movement() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .request_move(Direction::NorthEast, &mut events)
        .expect("blocked moves are not errors");

    assert_eq!(
        events,
        vec![Event::MoveBlocked {
            at: CellCoord::new(2, 2),
            direction: Direction::NorthEast,
        }]
    );
}

#[test]
fn successful_move_recomputes_sight_then_distances() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .request_move(Direction::East, &mut events)
        .expect("move succeeds");

    let destination = CellCoord::new(3, 2);
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        Event::ActorMoved {
            from: CellCoord::new(2, 2),
            to: destination,
            direction: Direction::East,
        }
    );
    assert!(matches!(events[1], Event::VisibilityRecomputed { .. }));
    assert!(matches!(events[2], Event::DistanceFieldScanned { goal, .. } if goal == destination));
    assert_eq!(coordinator.actor(), destination);
    assert_eq!(coordinator.distances().distance(destination), Ok(0.0));
    assert_eq!(coordinator.visibility().magnitude(destination), Ok(1.0));
}

#[test]
fn walking_into_a_door_opens_it_and_reveals_the_far_side() {
    let mut coordinator = coordinator(DOORWAY, CoordinatorConfig::default());
    let door = CellCoord::new(3, 1);
    let far_side = CellCoord::new(5, 1);
    assert_eq!(coordinator.is_explored(far_side), Ok(false));

    let mut events = Vec::new();
    coordinator
        .request_move(Direction::East, &mut events)
        .expect("move succeeds");

    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            Event::ActorMoved { .. } => "moved",
            Event::VisibilityRecomputed { .. } => "visibility",
            Event::TerrainChanged { .. } => "terrain",
            Event::DistanceFieldScanned { .. } => "scan",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["moved", "visibility", "terrain", "visibility", "scan"]
    );
    assert!(events.contains(&Event::TerrainChanged {
        cell: door,
        from: Terrain::ClosedDoor,
        to: Terrain::OpenDoor,
    }));
    assert_eq!(coordinator.map().terrain(door), Ok(Terrain::OpenDoor));
    assert_eq!(coordinator.visibility().is_visible(far_side), Ok(true));
    assert_eq!(coordinator.is_explored(far_side), Ok(true));
}

#[test]
fn queued_path_is_walked_with_a_single_final_scan() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let target = CellCoord::new(5, 2);

    let mut events = Vec::new();
    coordinator
        .set_target(target, &mut events)
        .expect("target inside level");
    assert_eq!(events, vec![Event::PathQueued { target, length: 3 }]);
    assert_eq!(coordinator.state(), MoveState::Following);
    assert_eq!(
        coordinator.queued_path().collect::<Vec<_>>(),
        vec![CellCoord::new(3, 2), CellCoord::new(4, 2), target]
    );

    let mut tick_events = Vec::new();
    for _ in 0..3 {
        coordinator.tick(&mut tick_events).expect("tick succeeds");
    }

    assert_eq!(coordinator.actor(), target);
    assert_eq!(coordinator.state(), MoveState::Idle);
    assert_eq!(scan_count(&tick_events), 1);
    assert!(matches!(
        tick_events.last(),
        Some(Event::DistanceFieldScanned { goal, .. }) if *goal == target
    ));
    assert!(tick_events.contains(&Event::PathCompleted { at: target }));
    assert_eq!(
        tick_events
            .iter()
            .filter(|event| matches!(event, Event::ActorMoved { .. }))
            .count(),
        3
    );
}

#[test]
fn tick_while_idle_is_a_no_op() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator.tick(&mut events).expect("tick succeeds");
    assert!(events.is_empty());
    assert_eq!(coordinator.actor(), CellCoord::new(2, 2));
}

#[test]
fn stale_field_is_rescanned_before_planning() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .set_target(CellCoord::new(5, 3), &mut events)
        .expect("target inside level");
    coordinator.tick(&mut events).expect("tick succeeds");
    events.clear();

    coordinator
        .set_target(CellCoord::new(1, 1), &mut events)
        .expect("target inside level");

    assert_eq!(scan_count(&events), 1);
    let Some(Event::PathQueued { length, .. }) = events.last() else {
        panic!("expected a queued path, got {events:?}");
    };
    let actor = coordinator.actor();
    assert_eq!(
        *length,
        usize::try_from(actor.manhattan_distance(CellCoord::new(1, 1))).expect("small")
    );
}

#[test]
fn cancel_drops_the_remaining_steps() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .set_target(CellCoord::new(5, 2), &mut events)
        .expect("target inside level");
    coordinator.tick(&mut events).expect("tick succeeds");
    events.clear();

    coordinator.cancel(&mut events);
    assert_eq!(events, vec![Event::PathCancelled { remaining: 2 }]);
    assert_eq!(coordinator.state(), MoveState::Idle);
    assert_eq!(coordinator.actor(), CellCoord::new(3, 2));

    events.clear();
    coordinator.cancel(&mut events);
    coordinator.tick(&mut events).expect("tick succeeds");
    assert!(events.is_empty());
}

#[test]
fn manual_step_cancels_the_queued_path() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .set_target(CellCoord::new(5, 2), &mut events)
        .expect("target inside level");
    events.clear();

    coordinator
        .request_move(Direction::North, &mut events)
        .expect("move succeeds");

    assert_eq!(events[0], Event::PathCancelled { remaining: 3 });
    assert!(matches!(events[1], Event::ActorMoved { direction: Direction::North, .. }));
    assert_eq!(coordinator.state(), MoveState::Idle);
    assert_eq!(coordinator.actor(), CellCoord::new(2, 1));
}

#[test]
fn blocked_step_keeps_the_queued_path() {
    let mut coordinator = coordinator(DOORWAY, unrestricted());
    let mut events = Vec::new();
    coordinator
        .set_target(CellCoord::new(5, 1), &mut events)
        .expect("target inside level");
    events.clear();

    coordinator
        .request_move(Direction::North, &mut events)
        .expect("blocked move is not an error");

    assert_eq!(
        events,
        vec![Event::MoveBlocked {
            at: CellCoord::new(2, 1),
            direction: Direction::North,
        }]
    );
    assert_eq!(coordinator.state(), MoveState::Following);
    assert_eq!(
        coordinator.queued_path().collect::<Vec<_>>(),
        vec![CellCoord::new(3, 1), CellCoord::new(4, 1), CellCoord::new(5, 1)]
    );

    events.clear();
    coordinator.tick(&mut events).expect("tick succeeds");
    assert_eq!(coordinator.actor(), CellCoord::new(3, 1));
}

#[test]
fn unreachable_target_reports_path_unavailable() {
    let mut coordinator = coordinator(
        "
        #######
        #.@#..#
        #######
        ",
        unrestricted(),
    );
    let mut events = Vec::new();
    coordinator
        .set_target(CellCoord::new(5, 1), &mut events)
        .expect("target inside level");

    assert_eq!(
        events,
        vec![Event::PathUnavailable {
            target: CellCoord::new(5, 1)
        }]
    );
    assert_eq!(coordinator.state(), MoveState::Idle);
}

#[test]
fn unexplored_cells_are_off_limits_when_restricted() {
    let target = CellCoord::new(5, 1);

    let mut restricted = coordinator(DOORWAY, CoordinatorConfig::default());
    let mut events = Vec::new();
    restricted
        .set_target(target, &mut events)
        .expect("target inside level");
    assert_eq!(events, vec![Event::PathUnavailable { target }]);

    let mut open = coordinator(DOORWAY, unrestricted());
    events.clear();
    open.set_target(target, &mut events)
        .expect("target inside level");
    assert_eq!(events, vec![Event::PathQueued { target, length: 3 }]);

    events.clear();
    for _ in 0..3 {
        open.tick(&mut events).expect("tick succeeds");
    }
    assert_eq!(open.actor(), target);
    assert_eq!(open.map().terrain(CellCoord::new(3, 1)), Ok(Terrain::OpenDoor));
}

#[test]
fn revealing_the_level_opens_it_to_path_planning() {
    let mut coordinator = coordinator(DOORWAY, CoordinatorConfig::default());
    let far_side = CellCoord::new(5, 1);
    let mut events = Vec::new();
    coordinator
        .set_target(far_side, &mut events)
        .expect("target inside level");
    assert_eq!(events, vec![Event::PathUnavailable { target: far_side }]);
    assert_eq!(coordinator.is_explored(far_side), Ok(false));

    events.clear();
    coordinator
        .handle(Command::RevealMap, &mut events)
        .expect("reveal succeeds");
    assert!(matches!(
        events.as_slice(),
        [Event::MapRevealed { newly_explored }] if *newly_explored > 0
    ));
    assert_eq!(coordinator.is_explored(far_side), Ok(true));

    events.clear();
    coordinator
        .set_target(far_side, &mut events)
        .expect("target inside level");
    assert_eq!(scan_count(&events), 1, "stale field is rescanned once");
    assert!(events.contains(&Event::PathQueued {
        target: far_side,
        length: 3,
    }));

    events.clear();
    coordinator.reveal_all(&mut events);
    assert_eq!(events, vec![Event::MapRevealed { newly_explored: 0 }]);
    assert_eq!(coordinator.state(), MoveState::Following);
}

#[test]
fn long_paths_are_refused() {
    let config = CoordinatorConfig {
        max_path_length: Some(2),
        ..CoordinatorConfig::default()
    };
    let mut coordinator = coordinator(ROOM, config);
    let mut events = Vec::new();

    coordinator
        .set_target(CellCoord::new(5, 2), &mut events)
        .expect("target inside level");
    coordinator
        .set_target(CellCoord::new(4, 2), &mut events)
        .expect("target inside level");

    assert_eq!(
        events,
        vec![
            Event::PathUnavailable {
                target: CellCoord::new(5, 2)
            },
            Event::PathQueued {
                target: CellCoord::new(4, 2),
                length: 2
            },
        ]
    );
}

#[test]
fn eight_way_movement_walks_diagonally() {
    let config = CoordinatorConfig {
        measurement: Measurement::Chebyshev,
        ..CoordinatorConfig::default()
    };
    let mut coordinator = coordinator(ROOM, config);
    let mut events = Vec::new();

    coordinator
        .set_target(CellCoord::new(4, 1), &mut events)
        .expect("target inside level");
    assert_eq!(
        events,
        vec![Event::PathQueued {
            target: CellCoord::new(4, 1),
            length: 2
        }]
    );
}

#[test]
fn targets_outside_the_level_are_errors() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    let result = coordinator.set_target(CellCoord::new(7, 0), &mut events);

    assert!(matches!(result, Err(CoordinatorError::Bounds(_))));
    assert!(events.is_empty());
}

#[test]
fn targeting_the_actor_only_clears_the_queue() {
    let mut coordinator = coordinator(ROOM, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .set_target(CellCoord::new(2, 2), &mut events)
        .expect("target inside level");
    assert!(events.is_empty());
    assert_eq!(coordinator.state(), MoveState::Idle);
}

#[test]
fn rebuild_resets_actor_queue_and_exploration() {
    let mut coordinator = coordinator(DOORWAY, CoordinatorConfig::default());
    let mut events = Vec::new();
    coordinator
        .request_move(Direction::East, &mut events)
        .expect("move succeeds");
    coordinator
        .set_target(CellCoord::new(5, 1), &mut events)
        .expect("target inside level");
    events.clear();

    coordinator
        .rebuild(Some(9), &mut events)
        .expect("rebuild succeeds");

    assert_eq!(
        events[0],
        Event::LevelRebuilt {
            seed: 9,
            width: 7,
            height: 3,
            spawn: CellCoord::new(2, 1),
        }
    );
    assert_eq!(coordinator.actor(), CellCoord::new(2, 1));
    assert_eq!(coordinator.state(), MoveState::Idle);
    assert_eq!(coordinator.seed(), 9);
    assert_eq!(
        coordinator.map().terrain(CellCoord::new(3, 1)),
        Ok(Terrain::ClosedDoor)
    );
    assert_eq!(coordinator.is_explored(CellCoord::new(5, 1)), Ok(false));

    events.clear();
    coordinator.rebuild(None, &mut events).expect("rebuild succeeds");
    assert_eq!(coordinator.seed(), next_seed(9));
}

#[derive(Debug)]
struct FailsAfterFirst {
    level: GeneratedLevel,
    calls: usize,
}

impl MapGenerator for FailsAfterFirst {
    fn generate(&mut self, _seed: u64) -> Result<GeneratedLevel, GenerationError> {
        self.calls += 1;
        if self.calls > 1 {
            return Err(GenerationError::NoFloor);
        }
        Ok(self.level.clone())
    }
}

#[test]
fn failed_rebuild_keeps_the_current_level() {
    let generator = FailsAfterFirst {
        level: GeneratedLevel::from_ascii(ROOM).expect("valid level"),
        calls: 0,
    };
    let mut events = Vec::new();
    let mut coordinator = MoveCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(generator),
        3,
        &mut events,
    )
    .expect("coordinator starts");
    coordinator
        .request_move(Direction::West, &mut events)
        .expect("move succeeds");
    events.clear();

    let result = coordinator.rebuild(Some(4), &mut events);
    assert_eq!(
        result,
        Err(CoordinatorError::Generation(GenerationError::NoFloor))
    );
    assert!(events.is_empty());
    assert_eq!(coordinator.actor(), CellCoord::new(1, 2));
    assert_eq!(coordinator.seed(), 3);
}

#[test]
fn spawn_on_impassable_terrain_is_rejected() {
    let level = GeneratedLevel {
        map: GridMap::new(3, 3, Terrain::Wall),
        spawn: CellCoord::new(1, 1),
    };
    let mut events = Vec::new();
    let result = MoveCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(StaticLayout::new(level)),
        0,
        &mut events,
    );

    assert!(matches!(
        result,
        Err(CoordinatorError::Generation(GenerationError::InvalidSpawn(_)))
    ));
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = CoordinatorConfig {
        scan_limit: Some(0.0),
        ..CoordinatorConfig::default()
    };
    let level = GeneratedLevel::from_ascii(ROOM).expect("valid level");
    let mut events = Vec::new();
    let result = MoveCoordinator::new(config, Box::new(StaticLayout::new(level)), 0, &mut events);

    assert!(matches!(result, Err(CoordinatorError::Config(_))));
}

#[test]
fn handle_dispatches_commands() {
    let mut direct = coordinator(ROOM, CoordinatorConfig::default());
    let mut dispatched = coordinator(ROOM, CoordinatorConfig::default());
    let mut direct_events = Vec::new();
    let mut dispatched_events = Vec::new();

    direct
        .set_target(CellCoord::new(4, 3), &mut direct_events)
        .expect("target inside level");
    direct.tick(&mut direct_events).expect("tick succeeds");
    direct.cancel(&mut direct_events);
    direct.reveal_all(&mut direct_events);
    direct
        .request_move(Direction::South, &mut direct_events)
        .expect("move succeeds");
    direct
        .rebuild(Some(5), &mut direct_events)
        .expect("rebuild succeeds");

    for command in [
        Command::SetTarget {
            cell: CellCoord::new(4, 3),
        },
        Command::Tick,
        Command::Cancel,
        Command::RevealMap,
        Command::RequestMove {
            direction: Direction::South,
        },
        Command::Rebuild { seed: Some(5) },
    ] {
        dispatched
            .handle(command, &mut dispatched_events)
            .expect("command succeeds");
    }

    assert_eq!(direct_events, dispatched_events);
    assert_eq!(direct.actor(), dispatched.actor());
}
