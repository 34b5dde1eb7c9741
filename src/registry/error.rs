//! Registration errors.

use crate::core::GraphInvariantError;
use thiserror::Error;

/// A graph that cannot join the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("typestate '{name}' is sealed and already declared at {previous}; declared again at {current}")]
    DuplicateSealed {
        name: String,
        previous: String,
        current: String,
    },

    #[error("extending typestate '{name}' breaks its structure: {source}")]
    InvalidExtension {
        name: String,
        #[source]
        source: GraphInvariantError,
    },

    #[error("typestate '{graph}': bridge '{bridge}' targets '{to_graph}.{to_state}' but '{to_graph}' has no state '{to_state}'")]
    MissingBridgeState {
        graph: String,
        bridge: String,
        to_graph: String,
        to_state: String,
    },

    #[error("typestate '{graph}': bridge '{bridge}' targets typestate '{to_graph}', which is never declared")]
    UnresolvedBridge {
        graph: String,
        bridge: String,
        to_graph: String,
    },
}
