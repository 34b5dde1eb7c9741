//! The typestate graph and its pure queries.

use super::location::Location;
use super::state::{base_name, State};
use super::transition::{Bridge, Transition};
use serde::{Deserialize, Serialize};

/// Generic parameter of a typestate, with its optional bound as written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    pub constraint: Option<String>,
}

impl GenericParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn bounded(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: Some(constraint.into()),
        }
    }
}

/// Policy flags of a typestate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFlags {
    /// Every operation touching a state must be marked transition or read-only.
    pub strict_transitions: bool,
    /// Forbid extensions and external transitions.
    pub sealed: bool,
    /// Transitions must take their source state by value.
    pub consume_on_transition: bool,
}

impl Default for GraphFlags {
    fn default() -> Self {
        Self {
            strict_transitions: true,
            sealed: true,
            consume_on_transition: true,
        }
    }
}

/// A named lifecycle: states, permitted transitions and bridges.
///
/// Graphs are built by the specification parser (or by hand, for tests),
/// validated once, and immutable afterwards. Every query normalizes state
/// names through [`base_name`], so instantiations such as `Empty<i32>` match
/// the declared `Empty<T>`.
///
/// # Example
///
/// ```rust
/// use typestates::core::{Transition, TypestateGraph};
///
/// let graph = TypestateGraph::new("File")
///     .with_states(["Closed", "Open"])
///     .with_transition(Transition::new("Closed", "Open"))
///     .with_transition(Transition::new("Open", "Closed"));
///
/// assert!(graph.has_transition("Closed", "Open"));
/// assert!(!graph.has_transition("Open", "Open"));
/// assert_eq!(graph.valid_destinations("Open"), vec!["Closed".to_string()]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypestateGraph {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
    pub bridges: Vec<Bridge>,
    pub flags: GraphFlags,
    pub initial_states: Vec<String>,
    pub terminal_states: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Module that declared the graph; operations from other modules are external.
    #[serde(default)]
    pub module: String,
}

impl TypestateGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            states: Vec::new(),
            transitions: Vec::new(),
            bridges: Vec::new(),
            flags: GraphFlags::default(),
            initial_states: Vec::new(),
            terminal_states: Vec::new(),
            location: None,
            module: String::new(),
        }
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.states
            .extend(states.into_iter().map(|s| State::parse(s.as_ref())));
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn with_bridge(mut self, bridge: Bridge) -> Self {
        self.bridges.push(bridge);
        self
    }

    pub fn with_initial<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.initial_states
            .extend(states.into_iter().map(|s| base_name(s.as_ref())));
        self
    }

    pub fn with_terminal<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.terminal_states
            .extend(states.into_iter().map(|s| base_name(s.as_ref())));
        self
    }

    pub fn with_flags(mut self, flags: GraphFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Look up a declared state by any type expression naming it.
    pub fn state(&self, repr: &str) -> Option<&State> {
        let base = base_name(repr);
        self.states.iter().find(|s| s.name == base)
    }

    pub fn has_state(&self, repr: &str) -> bool {
        self.state(repr).is_some()
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    pub fn is_initial_state(&self, repr: &str) -> bool {
        let base = base_name(repr);
        self.initial_states.iter().any(|s| *s == base)
    }

    pub fn is_terminal_state(&self, repr: &str) -> bool {
        let base = base_name(repr);
        self.terminal_states.iter().any(|s| *s == base)
    }

    /// True iff an explicit `from -> to` exists, or a wildcard `* -> to`
    /// exists and `from` is not terminal.
    pub fn has_transition(&self, from: &str, to: &str) -> bool {
        let from = base_name(from);
        let to = base_name(to);
        let source_terminal = self.is_terminal_state(&from);
        self.transitions.iter().any(|t| {
            t.targets(&to) && if t.is_wildcard { !source_terminal } else { t.from == from }
        })
    }

    /// Deduplicated destinations reachable from `from`: explicit ones first,
    /// then wildcard ones (unless `from` is terminal), in declaration order.
    pub fn valid_destinations(&self, from: &str) -> Vec<String> {
        let from = base_name(from);
        let source_terminal = self.is_terminal_state(&from);
        let explicit = self
            .transitions
            .iter()
            .filter(|t| !t.is_wildcard && t.from == from);
        let wildcard = self
            .transitions
            .iter()
            .filter(|t| t.is_wildcard && !source_terminal);

        let mut destinations: Vec<String> = Vec::new();
        for to in explicit.chain(wildcard).flat_map(|t| t.to.iter()) {
            if !destinations.contains(to) {
                destinations.push(to.clone());
            }
        }
        destinations
    }

    /// True iff a bridge `from -> to_graph.to_state` is declared.
    pub fn has_bridge(&self, from: &str, to_graph: &str, to_state: &str) -> bool {
        let from = base_name(from);
        let to_state = base_name(to_state);
        self.bridges
            .iter()
            .any(|b| b.from == from && b.to_graph == to_graph && b.to_state == to_state)
    }

    /// Deduplicated `Graph.State` destinations of bridges leaving `from`.
    pub fn valid_bridges(&self, from: &str) -> Vec<String> {
        let from = base_name(from);
        let mut destinations: Vec<String> = Vec::new();
        for bridge in self.bridges.iter().filter(|b| b.from == from) {
            let dest = format!("{}.{}", bridge.to_graph, bridge.to_state);
            if !destinations.contains(&dest) {
                destinations.push(dest);
            }
        }
        destinations
    }

    /// Destinations of the branching transition whose result type is `branch_type`.
    pub fn branch_members(&self, branch_type: &str) -> Option<&[String]> {
        let wanted = base_name(branch_type);
        self.transitions
            .iter()
            .find(|t| t.branch_type.as_deref() == Some(wanted.as_str()))
            .map(|t| t.to.as_slice())
    }
}
