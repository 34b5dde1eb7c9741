//! Structural checks run on every graph before it is registered.

use super::error::GraphInvariantError;
use super::graph::TypestateGraph;
use std::collections::HashSet;

impl TypestateGraph {
    /// Run the structural invariant checks in order, stopping at the first
    /// violation:
    ///
    /// 1. state base names are unique;
    /// 2. at most one branching transition leaves any state;
    /// 3. initial, terminal and transition/bridge endpoints are declared states;
    /// 4. no transition targets an initial state or leaves a terminal state.
    pub fn check_invariants(&self) -> Result<(), GraphInvariantError> {
        self.check_unique_states()?;
        self.check_single_branch_per_source()?;
        self.check_declared_references()?;
        self.check_initial_terminal_exclusion()
    }

    fn check_unique_states(&self) -> Result<(), GraphInvariantError> {
        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(state.name.as_str()) {
                return Err(GraphInvariantError::DuplicateState {
                    graph: self.name.clone(),
                    state: state.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_single_branch_per_source(&self) -> Result<(), GraphInvariantError> {
        let mut seen = HashSet::new();
        let branching = self
            .transitions
            .iter()
            .filter(|t| t.is_branching() && !t.is_wildcard);
        for transition in branching {
            if !seen.insert(transition.from.as_str()) {
                return Err(GraphInvariantError::DuplicateBranch {
                    graph: self.name.clone(),
                    state: transition.from.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_declared_references(&self) -> Result<(), GraphInvariantError> {
        let markers = self
            .initial_states
            .iter()
            .map(|s| ("initial", s))
            .chain(self.terminal_states.iter().map(|s| ("terminal", s)));
        for (role, state) in markers {
            if !self.has_state(state) {
                return Err(GraphInvariantError::UndeclaredMarker {
                    graph: self.name.clone(),
                    role,
                    state: state.clone(),
                });
            }
        }

        for transition in &self.transitions {
            let source = (!transition.is_wildcard).then_some(&transition.from);
            for state in source.into_iter().chain(transition.to.iter()) {
                if !self.has_state(state) {
                    return Err(GraphInvariantError::UndeclaredState {
                        graph: self.name.clone(),
                        transition: transition.to_string(),
                        state: state.clone(),
                    });
                }
            }
        }

        for bridge in &self.bridges {
            if !self.has_state(&bridge.from) {
                return Err(GraphInvariantError::UndeclaredState {
                    graph: self.name.clone(),
                    transition: bridge.to_string(),
                    state: bridge.from.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_initial_terminal_exclusion(&self) -> Result<(), GraphInvariantError> {
        for transition in &self.transitions {
            if let Some(state) = transition.to.iter().find(|s| self.is_initial_state(s)) {
                return Err(GraphInvariantError::TransitionToInitial {
                    graph: self.name.clone(),
                    transition: transition.to_string(),
                    state: state.clone(),
                });
            }
            if !transition.is_wildcard && self.is_terminal_state(&transition.from) {
                return Err(GraphInvariantError::TransitionFromTerminal {
                    graph: self.name.clone(),
                    transition: transition.to_string(),
                    state: transition.from.clone(),
                });
            }
        }
        for bridge in &self.bridges {
            if self.is_terminal_state(&bridge.from) {
                return Err(GraphInvariantError::TransitionFromTerminal {
                    graph: self.name.clone(),
                    transition: bridge.to_string(),
                    state: bridge.from.clone(),
                });
            }
        }
        Ok(())
    }
}
