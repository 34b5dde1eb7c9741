//! The typestate graph model.
//!
//! This module contains the pure data model shared by every other component:
//! - States compared by base name (see [`base_name`])
//! - Transitions, wildcard transitions and cross-graph bridges
//! - The [`TypestateGraph`] with its queries and structural invariants
//!
//! Nothing in here performs I/O or holds shared state.

mod error;
mod graph;
mod invariants;
mod location;
mod state;
mod transition;

pub use error::GraphInvariantError;
pub use graph::{GenericParam, GraphFlags, TypestateGraph};
pub use location::Location;
pub use state::{base_name, State, TypeRef};
pub(crate) use state::split_top_level;
pub use transition::{Bridge, Transition, WILDCARD};
