//! Edge lists and port assignment.

use crate::core::TypestateGraph;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Compass anchors used, in order, for edges arriving at a shared node.
const INCOMING_PORTS: [&str; 3] = ["n", "nw", "ne"];

/// Anchor of every self-loop.
const SELF_LOOP_PORT: &str = "e";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    Explicit,
    Wildcard,
    Bridge,
}

/// One drawn edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    /// Destination state, or `Graph.State` for bridges.
    pub to: String,
    pub kind: EdgeKind,
    /// Branch result type, shown as the edge label.
    pub label: Option<String>,
    pub tailport: Option<&'static str>,
    pub headport: Option<&'static str>,
}

impl Edge {
    fn new(from: &str, to: &str, kind: EdgeKind) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            label: None,
            tailport: None,
            headport: None,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.kind != EdgeKind::Bridge && self.from == self.to
    }
}

/// Graphviz `splines` setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoutingMode {
    #[default]
    Spline,
    Polyline,
    Curved,
    Ortho,
    Line,
}

impl RoutingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spline => "spline",
            Self::Polyline => "polyline",
            Self::Curved => "curved",
            Self::Ortho => "ortho",
            Self::Line => "line",
        }
    }

    /// Whether Graphviz honours compass ports in this mode.
    pub fn supports_ports(self) -> bool {
        matches!(self, Self::Spline | Self::Polyline | Self::Curved)
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown routing mode '{0}' (expected spline, polyline, curved, ortho or line)")]
pub struct UnknownRoutingMode(pub String);

impl FromStr for RoutingMode {
    type Err = UnknownRoutingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spline" | "splines" => Ok(Self::Spline),
            "polyline" => Ok(Self::Polyline),
            "curved" => Ok(Self::Curved),
            "ortho" => Ok(Self::Ortho),
            "line" => Ok(Self::Line),
            _ => Err(UnknownRoutingMode(s.to_string())),
        }
    }
}

/// Transition edges of `graph`: explicit edges in declaration order, then
/// wildcard edges from every non-terminal state unless an explicit edge
/// already joins the same pair.
pub fn transition_edges(graph: &TypestateGraph) -> Vec<Edge> {
    let mut edges: Vec<Edge> = Vec::new();
    for transition in graph.transitions.iter().filter(|t| !t.is_wildcard) {
        for to in &transition.to {
            let mut edge = Edge::new(&transition.from, to, EdgeKind::Explicit);
            edge.label = transition.branch_type.clone();
            edges.push(edge);
        }
    }

    for transition in graph.transitions.iter().filter(|t| t.is_wildcard) {
        for state in graph.state_names() {
            if graph.is_terminal_state(state) {
                continue;
            }
            for to in &transition.to {
                let duplicate = edges.iter().any(|e| e.from == state && e.to == *to);
                if !duplicate {
                    edges.push(Edge::new(state, to, EdgeKind::Wildcard));
                }
            }
        }
    }
    edges
}

/// Bridge edges of `graph`, each pointing at its qualified destination.
pub fn bridge_edges(graph: &TypestateGraph) -> Vec<Edge> {
    graph
        .bridges
        .iter()
        .map(|b| Edge::new(&b.from, &b.qualified_destination(), EdgeKind::Bridge))
        .collect()
}

/// Anchor self-loops on the east side and, when `mode` supports ports,
/// spread edges that share a destination round-robin over the incoming
/// anchors.
pub fn assign_ports(edges: &mut [Edge], mode: RoutingMode) {
    let mut incoming: HashMap<String, usize> = HashMap::new();
    for edge in edges.iter().filter(|e| !e.is_self_loop()) {
        *incoming.entry(edge.to.clone()).or_default() += 1;
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for edge in edges.iter_mut() {
        if edge.is_self_loop() {
            edge.tailport = Some(SELF_LOOP_PORT);
            edge.headport = Some(SELF_LOOP_PORT);
            continue;
        }
        if !mode.supports_ports() || incoming.get(&edge.to).copied().unwrap_or(0) < 2 {
            continue;
        }
        let slot = seen.entry(edge.to.clone()).or_default();
        edge.headport = Some(INCOMING_PORTS[*slot % INCOMING_PORTS.len()]);
        *slot += 1;
    }
}
