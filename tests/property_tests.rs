//! Property-based tests for the graph model, the specification parser and
//! the validator.
//!
//! Graphs are generated so they always satisfy the structural invariants:
//! no initial states, and explicit transitions only leave non-terminal states.

use proptest::prelude::*;
use stillwater::validation::Validation;
use typestates::core::{base_name, Transition, TypestateGraph};
use typestates::registry::Registry;
use typestates::spec::parse_typestate;
use typestates::validate::{validate_operation, Operation};

#[derive(Clone, Debug)]
struct Model {
    states: usize,
    terminal: Vec<bool>,
    explicit: Vec<(usize, usize)>,
    wildcard: Vec<usize>,
}

fn name(i: usize) -> String {
    format!("S{i}")
}

impl Model {
    fn graph(&self) -> TypestateGraph {
        let mut graph = TypestateGraph::new("Machine")
            .in_module("m")
            .with_states((0..self.states).map(name))
            .with_terminal((0..self.states).filter(|&i| self.terminal[i]).map(name));
        for &(from, to) in &self.explicit {
            graph = graph.with_transition(Transition::new(name(from), name(to)));
        }
        for &to in &self.wildcard {
            graph = graph.with_transition(Transition::wildcard(name(to)));
        }
        graph
    }

    fn spec_text(&self) -> String {
        let states: Vec<String> = (0..self.states).map(name).collect();
        let terminal: Vec<String> = (0..self.states)
            .filter(|&i| self.terminal[i])
            .map(name)
            .collect();
        let mut text = format!(
            "Machine {{\n  states {{ {} }}\n  terminal {{ {} }}\n  transitions {{\n",
            states.join(", "),
            terminal.join(", ")
        );
        for &(from, to) in &self.explicit {
            text.push_str(&format!("    {} -> {}\n", name(from), name(to)));
        }
        for &to in &self.wildcard {
            text.push_str(&format!("    * -> {}\n", name(to)));
        }
        text.push_str("  }\n}\n");
        text
    }

    /// Reference semantics of `has_transition`.
    fn allows(&self, from: usize, to: usize) -> bool {
        self.explicit.contains(&(from, to))
            || (!self.terminal[from] && self.wildcard.contains(&to))
    }
}

prop_compose! {
    fn arbitrary_model()(states in 2..7usize)(
        terminal in prop::collection::vec(any::<bool>(), states),
        pairs in prop::collection::vec((0..states, 0..states), 0..12),
        wildcard in prop::collection::vec(0..states, 0..3),
        states in Just(states),
    ) -> Model {
        let explicit = pairs
            .into_iter()
            .filter(|&(from, _)| !terminal[from])
            .collect();
        Model { states, terminal, explicit, wildcard }
    }
}

proptest! {
    #[test]
    fn generated_graphs_satisfy_invariants(model in arbitrary_model()) {
        prop_assert!(model.graph().check_invariants().is_ok());
    }

    #[test]
    fn has_transition_matches_reference(model in arbitrary_model()) {
        let graph = model.graph();
        for from in 0..model.states {
            for to in 0..model.states {
                prop_assert_eq!(
                    graph.has_transition(&name(from), &name(to)),
                    model.allows(from, to),
                    "{} -> {}", name(from), name(to)
                );
            }
        }
    }

    #[test]
    fn valid_destinations_agree_with_has_transition(model in arbitrary_model()) {
        let graph = model.graph();
        for from in 0..model.states {
            let destinations = graph.valid_destinations(&name(from));
            for to in 0..model.states {
                prop_assert_eq!(
                    destinations.contains(&name(to)),
                    graph.has_transition(&name(from), &name(to))
                );
            }
            let mut unique = destinations.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), destinations.len());
        }
    }

    #[test]
    fn terminal_states_only_leave_explicitly(model in arbitrary_model()) {
        let graph = model.graph();
        for from in (0..model.states).filter(|&i| model.terminal[i]) {
            for to in 0..model.states {
                if graph.has_transition(&name(from), &name(to)) {
                    prop_assert!(model.explicit.contains(&(from, to)));
                }
            }
        }
    }

    #[test]
    fn parsed_text_has_the_same_transitions(model in arbitrary_model()) {
        let parsed = parse_typestate(&model.spec_text()).unwrap();
        let built = model.graph();
        for from in 0..model.states {
            prop_assert_eq!(
                parsed.valid_destinations(&name(from)),
                built.valid_destinations(&name(from))
            );
        }
    }

    #[test]
    fn validator_accepts_exactly_the_declared_moves(
        model in arbitrary_model(),
        from_seed in any::<prop::sample::Index>(),
        to_seed in any::<prop::sample::Index>(),
    ) {
        let from = from_seed.index(model.states);
        let to = to_seed.index(model.states);
        let mut registry = Registry::new();
        registry.register(model.graph()).unwrap();

        let op = Operation::transition("step", name(from), [name(to)]).in_module("m");
        let accepted = matches!(validate_operation(&registry, &op), Validation::Success(_));
        prop_assert_eq!(accepted, model.allows(from, to) && !model.terminal[from]);
    }

    #[test]
    fn base_name_ignores_paths_references_and_arguments(
        ident in "[A-Z][a-z]{0,8}",
        module in "[a-z]{1,6}",
        reference in prop::sample::select(vec!["", "&", "&mut ", "&'a ", "&'a mut "]),
        args in prop::sample::select(vec!["", "<T>", "<u8, Vec<T>>"]),
    ) {
        prop_assume!(!["Box", "Rc", "Arc"].contains(&ident.as_str()));
        let repr = format!("{reference}crate::{module}::{ident}{args}");
        prop_assert_eq!(base_name(&repr), ident);
    }
}
