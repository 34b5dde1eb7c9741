//! Checking individual operations against the registry.
//!
//! Validation uses `Validation` rather than `Result`: a transition with
//! several bad destinations reports all of them at once. Lookups that every
//! later step depends on (the source state, the sealed rule and a terminal
//! source) stop at their first failure.

mod error;
mod operation;

pub use error::TransitionViolation;
pub use operation::{Destination, Operation, OperationKind};

use crate::core::{base_name, TypeRef, TypestateGraph};
use crate::error::Error;
use crate::registry::Registry;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{debug, trace};

/// Outcome of validating an operation.
pub type Validated = Validation<ValidatedOperation, NonEmptyVec<Error>>;

/// An operation the registry accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedOperation {
    /// The operation. Undeclared failure channels are annotated as empty.
    pub operation: Operation,
    /// Typestate owning the source state. `None` when the operation touches
    /// no state.
    pub typestate: Option<String>,
    /// Destinations after branch expansion.
    pub destinations: Vec<String>,
    /// Non-fatal findings, such as an unmarked operation on a state.
    pub warnings: Vec<TransitionViolation>,
}

impl ValidatedOperation {
    fn accepted(operation: &Operation) -> Self {
        Self {
            operation: Operation {
                failure_channels: Some(operation.failure_channels.clone().unwrap_or_default()),
                ..operation.clone()
            },
            typestate: None,
            destinations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Check `operation` against the graphs in `registry`.
///
/// # Example
///
/// ```rust
/// use stillwater::validation::Validation;
/// use typestates::registry::Registry;
/// use typestates::spec::parse_typestate;
/// use typestates::validate::{validate_operation, Operation};
///
/// let mut registry = Registry::new();
/// registry
///     .register(parse_typestate("File { states { Closed, Open } transitions { Closed -> Open } }").unwrap())
///     .unwrap();
///
/// let open = Operation::transition("open", "Closed", ["Open"]);
/// assert!(matches!(validate_operation(&registry, &open), Validation::Success(_)));
///
/// let reopen = Operation::transition("reopen", "Open", ["Open"]);
/// assert!(matches!(validate_operation(&registry, &reopen), Validation::Failure(_)));
/// ```
pub fn validate_operation(registry: &Registry, operation: &Operation) -> Validated {
    let channels = check_failure_channels(operation);
    let Some(graph) = registry.resolve_state(&operation.source) else {
        return match operation.kind {
            OperationKind::Transition => fail(TransitionViolation::UnknownState {
                operation: operation.name.clone(),
                state: base_name(&operation.source),
            }),
            _ => channels.map(|_| ValidatedOperation::accepted(operation)),
        };
    };

    let source = base_name(&operation.source);
    let external = operation.module != graph.module;
    trace!(
        operation = %operation.name,
        typestate = %graph.name,
        source = %source,
        external,
        "validating operation"
    );

    let mut validated = ValidatedOperation {
        typestate: Some(graph.name.clone()),
        ..ValidatedOperation::accepted(operation)
    };

    match operation.kind {
        OperationKind::ReadOnly => channels.map(|_| validated),
        OperationKind::Unmarked => {
            let mut checks = vec![channels];
            if graph.flags.strict_transitions {
                let violation = TransitionViolation::Unmarked {
                    operation: operation.name.clone(),
                    typestate: graph.name.clone(),
                    state: source,
                };
                if graph.flags.sealed && external {
                    checks.push(fail(violation));
                } else {
                    validated.warnings.push(violation);
                }
            }
            Validation::all_vec(checks).map(|_| validated)
        }
        OperationKind::Transition => {
            if graph.flags.sealed && external {
                return fail(TransitionViolation::SealedExternal {
                    operation: operation.name.clone(),
                    typestate: graph.name.clone(),
                    module: operation.module.clone(),
                    declared_in: graph.module.clone(),
                });
            }
            if graph.is_terminal_state(&source) {
                return fail(TransitionViolation::FromTerminal {
                    operation: operation.name.clone(),
                    typestate: graph.name.clone(),
                    from: source,
                });
            }

            let destinations = expand(registry, &operation.destination);
            let mut checks: Vec<Validation<(), NonEmptyVec<Error>>> = destinations
                .iter()
                .map(|to| check_destination(registry, graph, operation, &source, to))
                .collect();
            if destinations.is_empty() {
                checks.push(fail(TransitionViolation::MissingDestination {
                    operation: operation.name.clone(),
                    typestate: graph.name.clone(),
                    from: source.clone(),
                }));
            }
            checks.push(channels);

            if graph.flags.consume_on_transition && TypeRef::parse(&operation.source).borrowed {
                checks.push(fail(TransitionViolation::BorrowedSource {
                    operation: operation.name.clone(),
                    typestate: graph.name.clone(),
                    from: operation.source.clone(),
                }));
            }

            checks.push(match registry.check_bridges(&graph.name) {
                Ok(()) => Validation::success(()),
                Err(err) => Validation::fail(Error::from(err)),
            });

            validated.destinations = destinations;
            Validation::all_vec(checks).map(|_| {
                debug!(
                    operation = %validated.operation.name,
                    typestate = %graph.name,
                    destinations = ?validated.destinations,
                    "operation accepted"
                );
                validated
            })
        }
    }
}

/// Any declared failure channel is out-of-band, whatever the operation kind.
fn check_failure_channels(operation: &Operation) -> Validation<(), NonEmptyVec<Error>> {
    match operation.failure_channels.as_deref() {
        Some(channels) if !channels.is_empty() => fail(TransitionViolation::FailureChannel {
            operation: operation.name.clone(),
            channels: channels.to_vec(),
        }),
        _ => Validation::success(()),
    }
}

/// Destination states named by `destination`. A branch type known to the
/// registry expands to its members; an unknown one is treated as a state.
fn expand(registry: &Registry, destination: &Destination) -> Vec<String> {
    match destination {
        Destination::States(states) => states.iter().map(|s| base_name(s)).collect(),
        Destination::Branch(name) => match registry.resolve_branch(name) {
            Some((_, transition)) => transition.to.clone(),
            None => vec![base_name(name)],
        },
    }
}

fn check_destination(
    registry: &Registry,
    graph: &TypestateGraph,
    operation: &Operation,
    from: &str,
    to: &str,
) -> Validation<(), NonEmptyVec<Error>> {
    let owner = if graph.has_state(to) {
        Some(graph)
    } else {
        registry.resolve_state(to)
    };
    let Some(owner) = owner else {
        return fail(TransitionViolation::UnknownState {
            operation: operation.name.clone(),
            state: to.to_string(),
        });
    };

    if owner.is_initial_state(to) {
        return fail(TransitionViolation::ToInitial {
            operation: operation.name.clone(),
            typestate: owner.name.clone(),
            to: to.to_string(),
        });
    }

    if owner.name == graph.name {
        if graph.has_transition(from, to) {
            return Validation::success(());
        }
        return fail(TransitionViolation::UndeclaredTransition {
            operation: operation.name.clone(),
            typestate: graph.name.clone(),
            from: from.to_string(),
            to: to.to_string(),
            valid: alternatives(graph, from),
        });
    }

    if graph.has_bridge(from, &owner.name, to) {
        Validation::success(())
    } else {
        fail(TransitionViolation::UndeclaredBridge {
            operation: operation.name.clone(),
            typestate: graph.name.clone(),
            from: from.to_string(),
            to_graph: owner.name.clone(),
            to_state: to.to_string(),
            valid: alternatives(graph, from),
        })
    }
}

/// Every legal move from `from`: local destinations, then qualified bridges.
fn alternatives(graph: &TypestateGraph, from: &str) -> Vec<String> {
    let mut valid = graph.valid_destinations(from);
    valid.extend(graph.valid_bridges(from));
    valid
}

fn fail<T>(violation: TransitionViolation) -> Validation<T, NonEmptyVec<Error>> {
    Validation::fail(Error::from(violation))
}
