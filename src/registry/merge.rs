//! Merging an extension block into an unsealed graph.

use crate::core::TypestateGraph;

/// Union `extension` into `base`. States are matched by base name,
/// transitions and bridges by structural equality. `base` keeps its flags,
/// generics, location and module.
pub(crate) fn merge_into(base: &mut TypestateGraph, extension: TypestateGraph) {
    for state in extension.states {
        if !base.has_state(&state.name) {
            base.states.push(state);
        }
    }
    for transition in extension.transitions {
        if !base.transitions.iter().any(|t| t.same_edge(&transition)) {
            base.transitions.push(transition);
        }
    }
    for bridge in extension.bridges {
        if !base.bridges.iter().any(|b| b.same_edge(&bridge)) {
            base.bridges.push(bridge);
        }
    }
    for state in extension.initial_states {
        if !base.initial_states.contains(&state) {
            base.initial_states.push(state);
        }
    }
    for state in extension.terminal_states {
        if !base.terminal_states.contains(&state) {
            base.terminal_states.push(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bridge, Transition};

    #[test]
    fn merge_unions_and_deduplicates() {
        let mut base = TypestateGraph::new("Doc")
            .with_states(["Draft", "Review"])
            .with_transition(Transition::new("Draft", "Review"))
            .with_bridge(Bridge::new("Review", "Archive", "Stored"));
        let extension = TypestateGraph::new("Doc")
            .with_states(["Review", "Published"])
            .with_terminal(["Published"])
            .with_transition(Transition::new("Draft", "Review"))
            .with_transition(Transition::new("Review", "Published"))
            .with_bridge(Bridge::new("Review", "Archive", "Stored").with_module("store"));

        merge_into(&mut base, extension);

        assert_eq!(
            base.state_names().collect::<Vec<_>>(),
            vec!["Draft", "Review", "Published"]
        );
        assert_eq!(base.transitions.len(), 2);
        assert_eq!(base.bridges.len(), 1);
        assert_eq!(base.terminal_states, vec!["Published"]);
    }
}
