//! Graphviz DOT rendering.

use super::edges::{assign_ports, bridge_edges, transition_edges, Edge, EdgeKind, RoutingMode};
use crate::core::TypestateGraph;
use std::fmt;

/// How several graphs share an output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// One `digraph` with a cluster per typestate; bridges join clusters.
    #[default]
    Unified,
    /// One `digraph` per typestate; bridges end in placeholder nodes.
    Separate,
}

/// DOT text for a set of graphs. Rendered through [`fmt::Display`].
///
/// ```rust
/// use typestates::diagram::Diagram;
/// use typestates::spec::parse_typestate;
///
/// let graph = parse_typestate("File { states { Closed, Open } transitions { Closed -> Open } }").unwrap();
/// let dot = Diagram::new([&graph]).to_string();
/// assert!(dot.starts_with("digraph typestates {"));
/// assert!(dot.contains("\"File.Closed\" -> \"File.Open\""));
/// ```
#[derive(Clone, Debug)]
pub struct Diagram<'a> {
    graphs: Vec<&'a TypestateGraph>,
    layout: Layout,
    routing: RoutingMode,
}

impl<'a> Diagram<'a> {
    pub fn new(graphs: impl IntoIterator<Item = &'a TypestateGraph>) -> Self {
        Self {
            graphs: graphs.into_iter().collect(),
            layout: Layout::default(),
            routing: RoutingMode::default(),
        }
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn routing(mut self, routing: RoutingMode) -> Self {
        self.routing = routing;
        self
    }

    fn write_unified(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph typestates {{")?;
        self.write_header(f)?;
        writeln!(f, "  compound=true;")?;

        for graph in &self.graphs {
            writeln!(f)?;
            writeln!(f, "  subgraph {} {{", quote(&format!("cluster_{}", graph.name)))?;
            writeln!(f, "    label={};", quote(&graph.name))?;
            writeln!(f, "    style=rounded;")?;
            for state in graph.state_names() {
                write_node(f, "    ", &qualified(&graph.name, state), state, graph)?;
            }
            let mut edges = transition_edges(graph);
            assign_ports(&mut edges, self.routing);
            for edge in &edges {
                write_edge(
                    f,
                    "    ",
                    &qualified(&graph.name, &edge.from),
                    &qualified(&graph.name, &edge.to),
                    edge,
                )?;
            }
            writeln!(f, "  }}")?;
        }

        let mut gap = false;
        for graph in &self.graphs {
            for (bridge, edge) in graph.bridges.iter().zip(bridge_edges(graph)) {
                if !gap {
                    writeln!(f)?;
                    gap = true;
                }
                let target = qualified(&bridge.to_graph, &bridge.to_state);
                if !self.graphs.iter().any(|g| g.name == bridge.to_graph) {
                    writeln!(
                        f,
                        "  {} [label={}, shape=note, style=dashed];",
                        quote(&target),
                        quote(&edge.to)
                    )?;
                }
                write_edge(f, "  ", &qualified(&graph.name, &edge.from), &target, &edge)?;
            }
        }
        writeln!(f, "}}")
    }

    fn write_separate(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, graph) in self.graphs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "digraph {} {{", quote(&graph.name))?;
            self.write_header(f)?;
            writeln!(f, "  label={};", quote(&graph.name))?;
            for state in graph.state_names() {
                write_node(f, "  ", state, state, graph)?;
            }
            let mut edges = transition_edges(graph);
            assign_ports(&mut edges, self.routing);
            for edge in &edges {
                write_edge(f, "  ", &edge.from, &edge.to, edge)?;
            }
            for edge in bridge_edges(graph) {
                writeln!(
                    f,
                    "  {} [label={}, shape=doubleoctagon, style=dashed];",
                    quote(&edge.to),
                    quote(&edge.to)
                )?;
                write_edge(f, "  ", &edge.from, &edge.to, &edge)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }

    fn write_header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  rankdir=LR;")?;
        writeln!(f, "  splines={};", self.routing)?;
        writeln!(f, "  node [shape=box, style=rounded, fontname=\"Helvetica\"];")?;
        writeln!(f, "  edge [fontname=\"Helvetica\", fontsize=10];")
    }
}

impl fmt::Display for Diagram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layout {
            Layout::Unified => self.write_unified(f),
            Layout::Separate => self.write_separate(f),
        }
    }
}

fn write_node(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    id: &str,
    label: &str,
    graph: &TypestateGraph,
) -> fmt::Result {
    let mut attrs = format!("label={}", quote(label));
    if graph.is_initial_state(label) {
        attrs.push_str(", style=\"rounded,bold\"");
    }
    if graph.is_terminal_state(label) {
        attrs.push_str(", peripheries=2");
    }
    writeln!(f, "{indent}{} [{attrs}];", quote(id))
}

fn write_edge(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    from: &str,
    to: &str,
    edge: &Edge,
) -> fmt::Result {
    let mut attrs = String::new();
    match edge.kind {
        EdgeKind::Explicit => {}
        EdgeKind::Wildcard => attrs.push_str("style=dashed, color=gray40"),
        EdgeKind::Bridge => attrs.push_str("style=bold, color=blue"),
    }
    if let Some(label) = &edge.label {
        push_attr(&mut attrs, &format!("label={}", quote(label)));
    }
    if let Some(port) = edge.tailport {
        push_attr(&mut attrs, &format!("tailport={port}"));
    }
    if let Some(port) = edge.headport {
        push_attr(&mut attrs, &format!("headport={port}"));
    }

    write!(f, "{indent}{} -> {}", quote(from), quote(to))?;
    if attrs.is_empty() {
        writeln!(f, ";")
    } else {
        writeln!(f, " [{attrs}];")
    }
}

fn push_attr(attrs: &mut String, attr: &str) {
    if !attrs.is_empty() {
        attrs.push_str(", ");
    }
    attrs.push_str(attr);
}

fn qualified(graph: &str, state: &str) -> String {
    format!("{graph}.{state}")
}

fn quote(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 2);
    out.push('"');
    for c in id.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
