//! Line-oriented command parsing.

use delve_core::{CellCoord, Direction};

/// Intent typed on a single input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Input {
    /// One step per movement letter, taken in order.
    Steps(Vec<Direction>),
    /// Plans a path to the cell.
    Go(CellCoord),
    /// Advances a queued path by up to this many cells.
    Tick(u32),
    /// Follows the queued path to its end.
    Run,
    /// Drops the queued path.
    Cancel,
    /// Marks the whole level as explored.
    Reveal,
    /// Replaces the level, optionally with an explicit seed.
    Rebuild(Option<u64>),
    /// Redraws the frame.
    Show,
    /// Prints a level transfer string for the current level.
    Export,
    /// Prints the command reference.
    Help,
    /// Ends the session.
    Quit,
}

/// Errors raised for lines that are not commands.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum InputError {
    /// The line does not start with a known command.
    #[error("unknown command '{0}'; type 'help' for a list")]
    Unknown(String),
    /// A command was missing a required argument.
    #[error("'{0}' needs {1}")]
    MissingArgument(&'static str, &'static str),
    /// An argument was not a non-negative integer.
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
    /// A command received more arguments than it takes.
    #[error("too many arguments for '{0}'")]
    TrailingArguments(&'static str),
}

pub(crate) const HELP: &str = "\
movement   hjklyubn (vi keys) or wasd; runs such as 'lll' take several steps
go C R     walk to column C, row R one cell per tick
tick [N]   advance the walk by N cells (default 1)
run        walk until the target is reached
cancel     stop walking
reveal     mark the whole level as explored
rebuild [SEED]
           generate a new level
show       redraw the map
export     print a level string accepted by --import
help       show this text
quit       leave";

/// Parses a single input line.
pub(crate) fn parse(line: &str) -> Result<Input, InputError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(Input::Show);
    };
    let command = first.to_ascii_lowercase();

    let input = match command.as_str() {
        "go" => {
            let column = number(words.next(), "go", "a column and a row")?;
            let row = number(words.next(), "go", "a column and a row")?;
            Input::Go(CellCoord::new(column, row))
        }
        "tick" => match words.next() {
            Some(count) => Input::Tick(parse_number(count)?),
            None => Input::Tick(1),
        },
        "rebuild" => match words.next() {
            Some(seed) => Input::Rebuild(Some(parse_number(seed)?)),
            None => Input::Rebuild(None),
        },
        "run" => Input::Run,
        "cancel" => Input::Cancel,
        "reveal" => Input::Reveal,
        "show" => Input::Show,
        "export" => Input::Export,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        letters => {
            let steps = letters
                .chars()
                .map(direction_for)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| InputError::Unknown(first.to_owned()))?;
            Input::Steps(steps)
        }
    };

    if words.next().is_some() {
        return Err(InputError::TrailingArguments(command_name(&input)));
    }
    Ok(input)
}

fn direction_for(letter: char) -> Option<Direction> {
    let direction = match letter {
        'k' | 'w' => Direction::North,
        'u' => Direction::NorthEast,
        'l' | 'd' => Direction::East,
        'n' => Direction::SouthEast,
        'j' | 's' => Direction::South,
        'b' => Direction::SouthWest,
        'h' | 'a' => Direction::West,
        'y' => Direction::NorthWest,
        _ => return None,
    };
    Some(direction)
}

fn number<T: std::str::FromStr>(
    word: Option<&str>,
    command: &'static str,
    needs: &'static str,
) -> Result<T, InputError> {
    let word = word.ok_or(InputError::MissingArgument(command, needs))?;
    parse_number(word)
}

fn parse_number<T: std::str::FromStr>(word: &str) -> Result<T, InputError> {
    word.parse().map_err(|_| InputError::InvalidNumber(word.to_owned()))
}

fn command_name(input: &Input) -> &'static str {
    match input {
        Input::Steps(_) => "movement",
        Input::Go(_) => "go",
        Input::Tick(_) => "tick",
        Input::Run => "run",
        Input::Cancel => "cancel",
        Input::Reveal => "reveal",
        Input::Rebuild(_) => "rebuild",
        Input::Show => "show",
        Input::Export => "export",
        Input::Help => "help",
        Input::Quit => "quit",
    }
}
