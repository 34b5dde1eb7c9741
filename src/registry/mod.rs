//! Run-scoped store of typestate graphs.
//!
//! The registry owns cross-graph consistency: the sealed/extension policy and
//! bridge resolution. Registration needs `&mut Registry` while every query
//! takes `&Registry`, so one phase registers specifications one at a time and
//! any number of readers validate against the result afterwards.

mod error;
mod merge;

pub use error::RegistrationError;

use crate::core::{base_name, Bridge, Location, Transition, TypestateGraph};
use crate::error::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Graphs keyed by name, in registration order.
///
/// # Example
///
/// ```rust
/// use typestates::registry::Registry;
/// use typestates::spec::parse_typestate;
///
/// let mut registry = Registry::new();
/// registry
///     .register(parse_typestate("File { states { Closed, Open } }").unwrap())
///     .unwrap();
///
/// assert_eq!(registry.resolve_state("Open").map(|g| g.name.as_str()), Some("File"));
/// assert!(registry
///     .register(parse_typestate("File { states { Locked } }").unwrap())
///     .is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    graphs: Vec<TypestateGraph>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `graph`, merging it into an earlier unsealed declaration of
    /// the same name.
    ///
    /// Bridges whose destination typestate is already known are checked now,
    /// as are earlier bridges that target this typestate. Bridges into
    /// typestates that are not registered yet stay pending.
    pub fn register(&mut self, graph: TypestateGraph) -> Result<&TypestateGraph> {
        graph.check_invariants()?;
        let name = graph.name.clone();

        let slot = match self.index.get(&name).copied() {
            Some(slot) => {
                let existing = &self.graphs[slot];
                if existing.flags.sealed {
                    return Err(RegistrationError::DuplicateSealed {
                        name,
                        previous: describe(existing.location.as_ref()),
                        current: describe(graph.location.as_ref()),
                    }
                    .into());
                }
                let mut merged = existing.clone();
                merge::merge_into(&mut merged, graph);
                merged
                    .check_invariants()
                    .map_err(|source| RegistrationError::InvalidExtension {
                        name: name.clone(),
                        source,
                    })?;
                self.check_outgoing(&merged)?;
                debug!(typestate = %name, "merged typestate extension");
                self.graphs[slot] = merged;
                slot
            }
            None => {
                self.check_outgoing(&graph)?;
                self.check_incoming(&graph)?;
                debug!(typestate = %name, module = %graph.module, "registered typestate");
                self.graphs.push(graph);
                self.index.insert(name, self.graphs.len() - 1);
                self.graphs.len() - 1
            }
        };

        Ok(&self.graphs[slot])
    }

    pub fn graph(&self, name: &str) -> Option<&TypestateGraph> {
        self.index.get(name).map(|&slot| &self.graphs[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn graphs(&self) -> impl Iterator<Item = &TypestateGraph> {
        self.graphs.iter()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// The graph declaring the state named by `repr`. When several graphs
    /// declare the same base name, the first registered one owns it.
    pub fn resolve_state(&self, repr: &str) -> Option<&TypestateGraph> {
        let base = base_name(repr);
        self.graphs.iter().find(|g| g.has_state(&base))
    }

    /// The branching transition whose result type is `name`, with its graph.
    pub fn resolve_branch(&self, name: &str) -> Option<(&TypestateGraph, &Transition)> {
        let base = base_name(name);
        self.graphs.iter().find_map(|graph| {
            graph
                .transitions
                .iter()
                .find(|t| t.branch_type.as_deref() == Some(base.as_str()))
                .map(|t| (graph, t))
        })
    }

    /// Re-check the bridges of `name` against the graphs registered so far.
    /// Bridges into typestates that are still unknown are skipped.
    pub fn check_bridges(&self, name: &str) -> std::result::Result<(), RegistrationError> {
        match self.graph(name) {
            Some(graph) => self.check_outgoing(graph),
            None => Ok(()),
        }
    }

    /// Check every bridge of every graph; a bridge into a typestate that was
    /// never registered is an error once registration is complete.
    pub fn check_deferred_bridges(&self) -> std::result::Result<(), RegistrationError> {
        for graph in &self.graphs {
            for bridge in &graph.bridges {
                if !self.contains(&bridge.to_graph) {
                    return Err(RegistrationError::UnresolvedBridge {
                        graph: graph.name.clone(),
                        bridge: bridge.to_string(),
                        to_graph: bridge.to_graph.clone(),
                    });
                }
            }
            self.check_outgoing(graph)?;
        }
        Ok(())
    }

    /// Bridges of this registry's graphs that still wait for their destination.
    pub fn pending_bridges(&self) -> impl Iterator<Item = (&TypestateGraph, &Bridge)> {
        self.graphs.iter().flat_map(move |graph| {
            graph
                .bridges
                .iter()
                .filter(move |b| !self.contains(&b.to_graph))
                .map(move |b| (graph, b))
        })
    }

    fn check_outgoing(&self, graph: &TypestateGraph) -> std::result::Result<(), RegistrationError> {
        for bridge in &graph.bridges {
            let destination = if bridge.to_graph == graph.name {
                Some(graph)
            } else {
                self.graph(&bridge.to_graph)
            };
            match destination {
                Some(destination) => check_bridge(graph, bridge, destination)?,
                None => debug!(
                    typestate = %graph.name,
                    bridge = %bridge,
                    "bridge destination not registered yet, deferring"
                ),
            }
        }
        Ok(())
    }

    fn check_incoming(&self, graph: &TypestateGraph) -> std::result::Result<(), RegistrationError> {
        for source in &self.graphs {
            for bridge in source.bridges.iter().filter(|b| b.to_graph == graph.name) {
                check_bridge(source, bridge, graph)?;
            }
        }
        Ok(())
    }
}

fn check_bridge(
    source: &TypestateGraph,
    bridge: &Bridge,
    destination: &TypestateGraph,
) -> std::result::Result<(), RegistrationError> {
    if destination.has_state(&bridge.to_state) {
        Ok(())
    } else {
        warn!(typestate = %source.name, bridge = %bridge, "bridge destination state missing");
        Err(RegistrationError::MissingBridgeState {
            graph: source.name.clone(),
            bridge: bridge.to_string(),
            to_graph: bridge.to_graph.clone(),
            to_state: bridge.to_state.clone(),
        })
    }
}

fn describe(location: Option<&Location>) -> String {
    location.map_or_else(|| "an unknown location".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GraphInvariantError;
    use crate::error::Error;
    use crate::spec::parse_typestate;

    fn graph(source: &str) -> TypestateGraph {
        parse_typestate(source).unwrap()
    }

    #[test]
    fn second_sealed_declaration_is_rejected() {
        let mut registry = Registry::new();
        registry.register(graph("X { states { A } }")).unwrap();
        let err = registry.register(graph("X { states { B } }")).unwrap_err();
        assert!(matches!(
            err,
            Error::Registration(RegistrationError::DuplicateSealed { ref name, .. }) if name == "X"
        ));
        assert_eq!(registry.graph("X").unwrap().states.len(), 1);
    }

    #[test]
    fn unsealed_declarations_merge() {
        let mut registry = Registry::new();
        registry
            .register(graph(
                "X { sealed = false states { A, B } transitions { A -> B } }",
            ))
            .unwrap();
        let merged = registry
            .register(graph(
                "X { states { A, B, C } transitions { A -> B\n B -> C } }",
            ))
            .unwrap();

        assert_eq!(merged.state_names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(merged.transitions.len(), 2);
        assert!(!merged.flags.sealed);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn merge_that_breaks_invariants_is_rejected_and_leaves_graph_untouched() {
        let mut registry = Registry::new();
        registry
            .register(graph(
                "X { sealed = false states { A, B } initial: A transitions { A -> B } }",
            ))
            .unwrap();
        let err = registry
            .register(graph("X { states { A, B } transitions { B -> A } }"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registration(RegistrationError::InvalidExtension {
                source: GraphInvariantError::TransitionToInitial { .. },
                ..
            })
        ));
        assert_eq!(registry.graph("X").unwrap().transitions.len(), 1);
    }

    #[test]
    fn bridge_to_known_graph_is_checked_immediately() {
        let mut registry = Registry::new();
        registry
            .register(graph("Session { states { Active, Closed } }"))
            .unwrap();
        let err = registry
            .register(graph(
                "Auth { states { Granted } bridges { Granted -> Session.Missing } }",
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registration(RegistrationError::MissingBridgeState { ref to_state, .. })
                if to_state == "Missing"
        ));
    }

    #[test]
    fn bridge_to_unknown_graph_is_deferred() {
        let mut registry = Registry::new();
        registry
            .register(graph(
                "Auth { states { Granted } bridges { Granted -> Session.Active } }",
            ))
            .unwrap();
        assert_eq!(registry.pending_bridges().count(), 1);
        assert!(matches!(
            registry.check_deferred_bridges(),
            Err(RegistrationError::UnresolvedBridge { .. })
        ));

        registry
            .register(graph("Session { states { Active } }"))
            .unwrap();
        assert_eq!(registry.pending_bridges().count(), 0);
        assert_eq!(registry.check_deferred_bridges(), Ok(()));
        assert_eq!(registry.check_bridges("Auth"), Ok(()));
    }

    #[test]
    fn late_destination_without_bridged_state_is_rejected() {
        let mut registry = Registry::new();
        registry
            .register(graph(
                "Auth { states { Granted } bridges { Granted -> Session.Active } }",
            ))
            .unwrap();
        let err = registry
            .register(graph("Session { states { Idle } }"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registration(RegistrationError::MissingBridgeState { .. })
        ));
        assert!(!registry.contains("Session"));
    }

    #[test]
    fn resolves_states_and_branch_types() {
        let mut registry = Registry::new();
        registry
            .register(graph(
                "File { states { Closed, Open, Failed } transitions { Closed -> Open | Failed as OpenResult } }",
            ))
            .unwrap();

        assert_eq!(registry.resolve_state("&mut Open").unwrap().name, "File");
        assert!(registry.resolve_state("Socket").is_none());
        let (owner, transition) = registry.resolve_branch("OpenResult").unwrap();
        assert_eq!(owner.name, "File");
        assert_eq!(transition.to, vec!["Open", "Failed"]);
    }
}
