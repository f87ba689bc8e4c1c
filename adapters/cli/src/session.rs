//! Applies parsed input to the coordinator and composes the reply.

use delve_core::{Command, Event, MoveState};
use delve_system_movement::{CoordinatorError, MoveCoordinator};
use tracing::warn;

use crate::{
    input::{Input, HELP},
    level_transfer::LevelSnapshot,
    render,
};

/// Interactive session wrapping a coordinator.
#[derive(Debug)]
pub(crate) struct Session {
    coordinator: MoveCoordinator,
    events: Vec<Event>,
}

impl Session {
    pub(crate) fn new(coordinator: MoveCoordinator) -> Self {
        Self {
            coordinator,
            events: Vec::new(),
        }
    }

    /// Executes one input and returns the text to print.
    pub(crate) fn execute(&mut self, input: Input) -> String {
        self.events.clear();
        let result = match input {
            Input::Help => return HELP.to_owned(),
            Input::Export => return self.export(),
            Input::Show | Input::Quit => Ok(()),
            Input::Steps(directions) => self.walk(&directions),
            Input::Go(cell) => self.send(Command::SetTarget { cell }),
            Input::Tick(count) => self.advance(Some(count)),
            Input::Run => self.advance(None),
            Input::Cancel => self.send(Command::Cancel),
            Input::Reveal => self.send(Command::RevealMap),
            Input::Rebuild(seed) => self.send(Command::Rebuild { seed }),
        };

        let mut reply: Vec<String> = self.events.iter().filter_map(render::describe).collect();
        if let Err(error) = result {
            warn!(%error, "command failed");
            reply.push(format!("error: {error}"));
        }
        reply.push(self.frame());
        reply.join("\n")
    }

    /// Current frame followed by the status line.
    pub(crate) fn frame(&self) -> String {
        format!(
            "{}\n{}",
            render::frame(&self.coordinator),
            render::status_line(&self.coordinator)
        )
    }

    #[cfg(test)]
    pub(crate) fn coordinator(&self) -> &MoveCoordinator {
        &self.coordinator
    }

    fn send(&mut self, command: Command) -> Result<(), CoordinatorError> {
        self.coordinator.handle(command, &mut self.events)
    }

    fn walk(&mut self, directions: &[delve_core::Direction]) -> Result<(), CoordinatorError> {
        for &direction in directions {
            let before = self.events.len();
            self.send(Command::RequestMove { direction })?;
            let blocked = self.events[before..]
                .iter()
                .any(|event| matches!(event, Event::MoveBlocked { .. }));
            if blocked {
                break;
            }
        }
        Ok(())
    }

    /// Ticks `limit` times, or until the path ends when no limit is given.
    fn advance(&mut self, limit: Option<u32>) -> Result<(), CoordinatorError> {
        let mut ticks = 0;
        while self.coordinator.state() == MoveState::Following
            && limit.map_or(true, |limit| ticks < limit)
        {
            self.send(Command::Tick)?;
            ticks += 1;
        }
        Ok(())
    }

    fn export(&self) -> String {
        let snapshot = LevelSnapshot::capture(self.coordinator.map(), self.coordinator.actor());
        match snapshot.encode() {
            Ok(encoded) => encoded,
            Err(error) => format!("error: {error}"),
        }
    }
}
