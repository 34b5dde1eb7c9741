//! Structural invariant violations of a typestate graph.

use thiserror::Error;

/// A graph that parsed but is internally inconsistent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphInvariantError {
    #[error("typestate '{graph}' declares state '{state}' more than once (states are compared by base name)")]
    DuplicateState { graph: String, state: String },

    #[error("typestate '{graph}' has more than one branching transition from '{state}'")]
    DuplicateBranch { graph: String, state: String },

    #[error("typestate '{graph}': {role} state '{state}' is not declared in states")]
    UndeclaredMarker {
        graph: String,
        role: &'static str,
        state: String,
    },

    #[error("typestate '{graph}': transition '{transition}' references undeclared state '{state}'")]
    UndeclaredState {
        graph: String,
        transition: String,
        state: String,
    },

    #[error("typestate '{graph}': transition '{transition}' targets initial state '{state}'")]
    TransitionToInitial {
        graph: String,
        transition: String,
        state: String,
    },

    #[error("typestate '{graph}': transition '{transition}' leaves terminal state '{state}'")]
    TransitionFromTerminal {
        graph: String,
        transition: String,
        state: String,
    },
}
