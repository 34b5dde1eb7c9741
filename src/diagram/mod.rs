//! Diagram emitter.
//!
//! Turns finished graphs into Graphviz DOT text. Every explicit transition is
//! drawn once per destination; a wildcard is drawn from each non-terminal
//! state unless an explicit edge already joins the same pair. Styling is
//! cosmetic.

mod dot;
mod edges;

pub use dot::{Diagram, Layout};
pub use edges::{
    assign_ports, bridge_edges, transition_edges, Edge, EdgeKind, RoutingMode, UnknownRoutingMode,
};
