use larvaworld_body::BodyError;
use larvaworld_params::ParError;
use thiserror::Error;

use crate::agent::AgentId;

/// Errors raised by the simulation layer
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Body(#[from] BodyError),

    #[error(transparent)]
    Params(#[from] ParError),

    #[error("Replay column {0} is missing")]
    MissingColumn(String),

    #[error("Replay column {column} has {len} rows, expected {expected}")]
    ColumnLength {
        column: String,
        len: usize,
        expected: usize,
    },

    #[error("Orientation values are present for {found} of {needed} segments")]
    MissingOrientations { found: usize, needed: usize },

    #[error("Replay of {segments} segments needs 2 segments or {points} - 1 spinepoints")]
    UnsupportedSegmentCount { segments: usize, points: usize },

    #[error("Replay tick {tick} is past the end of the track ({len} ticks)")]
    ReplayFinished { tick: usize, len: usize },

    #[error("No agent with id {0}")]
    UnknownAgent(AgentId),
}

pub type Result<T> = std::result::Result<T, SimError>;
