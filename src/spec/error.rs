//! Grammar errors raised while parsing a specification block.

use crate::core::Location;
use thiserror::Error;

/// Malformed specification text. Always carries the offending location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecificationError {
    #[error("{location}: unexpected character '{ch}'")]
    InvalidCharacter { ch: char, location: Location },

    #[error("{location}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: Location,
    },

    #[error("{location}: expected {expected}, found end of input")]
    UnexpectedEof { expected: String, location: Location },

    #[error("{location}: branching transition '{transition}' needs a result type, write '... as Name'")]
    MissingBranchName { transition: String, location: Location },

    #[error("{location}: transition '{transition}' has a single destination and cannot be named '{name}'")]
    UnexpectedBranchName {
        transition: String,
        name: String,
        location: Location,
    },

    #[error("{location}: unknown flag '{name}' (expected strict_transitions, sealed or consume_on_transition)")]
    UnknownFlag { name: String, location: Location },

    #[error("{location}: flag '{name}' expects true or false, found '{value}'")]
    InvalidFlagValue {
        name: String,
        value: String,
        location: Location,
    },

    #[error("{location}: unknown section '{name}' (expected states, initial, terminal, transitions or bridges)")]
    UnknownSection { name: String, location: Location },

    #[error("{location}: typestate '{name}' declares no states")]
    EmptyBlock { name: String, location: Location },

    #[error("{location}: bridge destination '{text}' must be written Typestate.State")]
    InvalidBridge { text: String, location: Location },
}

impl SpecificationError {
    pub fn location(&self) -> &Location {
        match self {
            Self::InvalidCharacter { location, .. }
            | Self::UnexpectedToken { location, .. }
            | Self::UnexpectedEof { location, .. }
            | Self::MissingBranchName { location, .. }
            | Self::UnexpectedBranchName { location, .. }
            | Self::UnknownFlag { location, .. }
            | Self::InvalidFlagValue { location, .. }
            | Self::UnknownSection { location, .. }
            | Self::EmptyBlock { location, .. }
            | Self::InvalidBridge { location, .. } => location,
        }
    }

    pub(crate) fn location_mut(&mut self) -> &mut Location {
        match self {
            Self::InvalidCharacter { location, .. }
            | Self::UnexpectedToken { location, .. }
            | Self::UnexpectedEof { location, .. }
            | Self::MissingBranchName { location, .. }
            | Self::UnexpectedBranchName { location, .. }
            | Self::UnknownFlag { location, .. }
            | Self::InvalidFlagValue { location, .. }
            | Self::UnknownSection { location, .. }
            | Self::EmptyBlock { location, .. }
            | Self::InvalidBridge { location, .. } => location,
        }
    }
}
