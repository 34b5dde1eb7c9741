//! Second pass: cross-referencing scanned operations against every graph.

use super::scan::ScannedOperation;
use crate::core::{base_name, TypeRef, TypestateGraph};
use crate::registry::Registry;
use crate::validate::{OperationKind, TransitionViolation};

/// Result type whose error arm is an out-of-band failure channel.
const FALLIBLE_WRAPPER: &str = "Result";

/// Return type of a function that returns nothing.
const UNIT: &str = "()";

/// Findings for one operation.
#[derive(Debug, Default)]
pub(crate) struct Audit {
    pub errors: Vec<TransitionViolation>,
    pub warnings: Vec<TransitionViolation>,
    /// Whether the operation was a transition on a known state.
    pub checked: bool,
}

pub(crate) fn audit(registry: &Registry, module: &str, op: &ScannedOperation) -> Audit {
    let mut audit = Audit::default();
    let Some(graph) = registry.resolve_state(&op.source) else {
        return audit;
    };
    let source = base_name(&op.source);
    let external = graph.module != module;
    let target = op
        .returns
        .as_deref()
        .map(|returns| unwrap_fallible(op, returns, &mut audit));

    match op.kind {
        OperationKind::ReadOnly => {}
        OperationKind::Unmarked => {
            if graph.flags.strict_transitions {
                let violation = TransitionViolation::Unmarked {
                    operation: op.name.clone(),
                    typestate: graph.name.clone(),
                    state: source,
                };
                if graph.flags.sealed && external {
                    audit.errors.push(violation);
                } else {
                    audit.warnings.push(violation);
                }
            }
        }
        OperationKind::Transition => {
            audit.checked = true;
            if graph.flags.sealed && external {
                audit.errors.push(TransitionViolation::SealedExternal {
                    operation: op.name.clone(),
                    typestate: graph.name.clone(),
                    module: module.to_string(),
                    declared_in: graph.module.clone(),
                });
            }
            if graph.flags.consume_on_transition && TypeRef::parse(&op.source).borrowed {
                audit.errors.push(TransitionViolation::BorrowedSource {
                    operation: op.name.clone(),
                    typestate: graph.name.clone(),
                    from: op.source.clone(),
                });
            }
            if graph.is_terminal_state(&source) {
                audit.errors.push(TransitionViolation::FromTerminal {
                    operation: op.name.clone(),
                    typestate: graph.name.clone(),
                    from: source,
                });
                return audit;
            }
            match target.as_deref() {
                None | Some(UNIT) => audit.errors.push(TransitionViolation::MissingDestination {
                    operation: op.name.clone(),
                    typestate: graph.name.clone(),
                    from: source,
                }),
                Some(target) => {
                    for to in targets(registry, target) {
                        if let Some(violation) = check_target(registry, graph, op, &source, &to) {
                            audit.errors.push(violation);
                        }
                    }
                }
            }
        }
    }
    audit
}

/// Strip a `Result<T, E>` return down to `T`, recording `E` as a failure
/// channel.
fn unwrap_fallible(op: &ScannedOperation, returns: &str, audit: &mut Audit) -> String {
    let ty = TypeRef::parse(returns);
    match ty.args.as_slice() {
        [ok, err] if ty.base == FALLIBLE_WRAPPER => {
            audit.errors.push(TransitionViolation::FailureChannel {
                operation: op.name.clone(),
                channels: vec![err.clone()],
            });
            ok.clone()
        }
        _ => returns.to_string(),
    }
}

fn targets(registry: &Registry, returns: &str) -> Vec<String> {
    match registry.resolve_branch(returns) {
        Some((_, transition)) => transition.to.clone(),
        None => vec![base_name(returns)],
    }
}

fn check_target(
    registry: &Registry,
    graph: &TypestateGraph,
    op: &ScannedOperation,
    from: &str,
    to: &str,
) -> Option<TransitionViolation> {
    let owner = if graph.has_state(to) {
        graph
    } else {
        match registry.resolve_state(to) {
            Some(owner) => owner,
            None => {
                return Some(TransitionViolation::UnknownState {
                    operation: op.name.clone(),
                    state: to.to_string(),
                })
            }
        }
    };

    let mut valid = graph.valid_destinations(from);
    valid.extend(graph.valid_bridges(from));

    if owner.is_initial_state(to) {
        Some(TransitionViolation::ToInitial {
            operation: op.name.clone(),
            typestate: owner.name.clone(),
            to: to.to_string(),
        })
    } else if owner.name != graph.name {
        (!graph.has_bridge(from, &owner.name, to)).then(|| TransitionViolation::UndeclaredBridge {
            operation: op.name.clone(),
            typestate: graph.name.clone(),
            from: from.to_string(),
            to_graph: owner.name.clone(),
            to_state: to.to_string(),
            valid,
        })
    } else {
        (!graph.has_transition(from, to)).then(|| TransitionViolation::UndeclaredTransition {
            operation: op.name.clone(),
            typestate: graph.name.clone(),
            from: from.to_string(),
            to: to.to_string(),
            valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Location;
    use crate::spec::SpecParser;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        let graph = SpecParser::new()
            .module("src/file.rs")
            .parse(
                "File {
                    states { Closed, Open, Failed }
                    initial: Closed
                    terminal: Failed
                    transitions {
                        Closed -> Open
                        * -> Failed
                    }
                }",
            )
            .unwrap();
        registry.register(graph).unwrap();
        registry
    }

    fn op(kind: OperationKind, source: &str, returns: Option<&str>) -> ScannedOperation {
        ScannedOperation {
            name: "op".into(),
            kind,
            source: source.into(),
            returns: returns.map(Into::into),
            location: Location::in_file("src/file.rs", 1, 1),
        }
    }

    #[test]
    fn declared_transition_passes() {
        let audit = audit(&registry(), "src/file.rs", &op(OperationKind::Transition, "Closed", Some("Open")));
        assert!(audit.checked);
        assert!(audit.errors.is_empty());
    }

    #[test]
    fn result_return_is_a_failure_channel() {
        let audit = audit(
            &registry(),
            "src/file.rs",
            &op(OperationKind::Transition, "Closed", Some("Result<Open, io::Error>")),
        );
        assert!(matches!(
            &audit.errors[..],
            [TransitionViolation::FailureChannel { channels, .. }] if channels == &["io::Error"]
        ));
    }

    #[test]
    fn fallible_read_only_and_unmarked_operations_are_rejected() {
        let size = op(OperationKind::ReadOnly, "&Open", Some("Result<u64, io::Error>"));
        let found = audit(&registry(), "src/file.rs", &size);
        assert!(matches!(
            &found.errors[..],
            [TransitionViolation::FailureChannel { channels, .. }] if channels == &["io::Error"]
        ));
        assert!(!found.checked);

        let peek = op(OperationKind::Unmarked, "&Open", Some("Result<(), Error>"));
        let found = audit(&registry(), "src/file.rs", &peek);
        assert_eq!((found.errors.len(), found.warnings.len()), (1, 1));
    }

    #[test]
    fn transition_without_destination_is_rejected() {
        for returns in [None, Some("()"), Some("Result<(), io::Error>")] {
            let found = audit(&registry(), "src/file.rs", &op(OperationKind::Transition, "Open", returns));
            assert!(found.checked);
            assert!(
                found
                    .errors
                    .iter()
                    .any(|v| matches!(v, TransitionViolation::MissingDestination { from, .. } if from == "Open")),
                "{returns:?}: {:?}",
                found.errors
            );
            assert!(!found
                .errors
                .iter()
                .any(|v| matches!(v, TransitionViolation::UnknownState { .. })));
        }
    }

    #[test]
    fn unmarked_is_warning_inside_and_error_outside() {
        let unmarked = op(OperationKind::Unmarked, "&Open", None);
        let inside = audit(&registry(), "src/file.rs", &unmarked);
        assert_eq!((inside.errors.len(), inside.warnings.len()), (0, 1));
        let outside = audit(&registry(), "src/other.rs", &unmarked);
        assert_eq!((outside.errors.len(), outside.warnings.len()), (1, 0));
        assert!(!outside.checked);
    }

    #[test]
    fn transition_checks_accumulate() {
        let audit = audit(
            &registry(),
            "src/file.rs",
            &op(OperationKind::Transition, "&mut Open", Some("Closed")),
        );
        assert_eq!(audit.errors.len(), 2);
        assert!(matches!(audit.errors[0], TransitionViolation::BorrowedSource { .. }));
        assert!(matches!(audit.errors[1], TransitionViolation::ToInitial { .. }));
    }

    #[test]
    fn terminal_source_stops_checking() {
        let audit = audit(&registry(), "src/file.rs", &op(OperationKind::Transition, "Failed", Some("Open")));
        assert!(matches!(&audit.errors[..], [TransitionViolation::FromTerminal { .. }]));
    }

    #[test]
    fn operations_on_other_types_are_ignored() {
        let audit = audit(&registry(), "src/file.rs", &op(OperationKind::Transition, "String", Some("Open")));
        assert!(!audit.checked);
        assert!(audit.errors.is_empty());
    }
}
