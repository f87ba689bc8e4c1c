use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use delve_core::{CellCoord, GenerationError};
use delve_world::{GeneratedLevel, GridMap, ParseError};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "delve";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "delve:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Terrain and spawn of a level, transferable as a single line of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LevelSnapshot {
    width: u32,
    height: u32,
    spawn: CellCoord,
    rows: Vec<String>,
}

impl LevelSnapshot {
    /// Captures the current terrain with `spawn` as the starting cell.
    #[must_use]
    pub(crate) fn capture(map: &GridMap, spawn: CellCoord) -> Self {
        Self {
            width: map.width(),
            height: map.height(),
            spawn,
            rows: map.to_ascii().lines().map(str::to_owned).collect(),
        }
    }

    /// Encodes the snapshot as `delve:v1:<W>x<H>:<payload>`.
    pub(crate) fn encode(&self) -> Result<String, LevelTransferError> {
        let payload = SerializableSnapshot {
            spawn: self.spawn,
            rows: self.rows.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LevelTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.width, self.height
        ))
    }

    /// Decodes a snapshot from its string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LevelTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LevelTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LevelTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LevelTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LevelTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LevelTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LevelTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LevelTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (width, height) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LevelTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LevelTransferError::InvalidPayload)?;

        Ok(Self {
            width,
            height,
            spawn: decoded.spawn,
            rows: decoded.rows,
        })
    }

    /// Rebuilds the level, checking it against the declared dimensions.
    pub(crate) fn into_level(self) -> Result<GeneratedLevel, LevelTransferError> {
        let map = GridMap::from_ascii(&self.rows.join("\n"))?;
        if map.dimensions() != (self.width, self.height) {
            return Err(LevelTransferError::DimensionMismatch {
                declared: (self.width, self.height),
                found: map.dimensions(),
            });
        }

        let level = GeneratedLevel {
            map,
            spawn: self.spawn,
        };
        level.validate()?;
        Ok(level)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SerializableSnapshot {
    spawn: CellCoord,
    rows: Vec<String>,
}

/// Errors that can occur while encoding or decoding level transfer strings.
#[derive(Debug, thiserror::Error)]
pub(crate) enum LevelTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("level string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("level string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("level string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("level string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("level string is missing the payload")]
    MissingPayload,
    /// The prefix segment named another format.
    #[error("level prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment named an unsupported revision.
    #[error("level version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode level payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be (de)serialised.
    #[error("could not parse level payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// The rows do not describe a valid layout.
    #[error("level rows are invalid: {0}")]
    InvalidLayout(#[from] ParseError),
    /// The rows disagree with the declared dimensions.
    #[error("level declares {}x{} cells but holds {}x{}", declared.0, declared.1, found.0, found.1)]
    DimensionMismatch {
        /// Dimensions written in the header.
        declared: (u32, u32),
        /// Dimensions of the decoded rows.
        found: (u32, u32),
    },
    /// The spawn is not a passable cell of the level.
    #[error(transparent)]
    InvalidSpawn(#[from] GenerationError),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LevelTransferError> {
    let invalid = || LevelTransferError::InvalidDimensions(dimensions.to_owned());
    let (width, height) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}
