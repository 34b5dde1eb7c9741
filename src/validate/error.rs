//! Protocol violations found while checking an operation.

use thiserror::Error;

fn alternatives(valid: &[String]) -> String {
    if valid.is_empty() {
        "none".to_string()
    } else {
        valid.join(", ")
    }
}

/// An operation that its typestate does not permit.
///
/// Transition and bridge failures list every legal move from the source state
/// so the diagnostic can suggest an alternative.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionViolation {
    #[error("operation '{operation}': '{state}' is not a state of any registered typestate")]
    UnknownState { operation: String, state: String },

    #[error("operation '{operation}' in module '{module}' changes state of sealed typestate '{typestate}' declared in '{declared_in}'; only read-only operations may be added outside it")]
    SealedExternal {
        operation: String,
        typestate: String,
        module: String,
        declared_in: String,
    },

    #[error("operation '{operation}': '{from}' is a terminal state of '{typestate}' and has no outgoing transitions")]
    FromTerminal {
        operation: String,
        typestate: String,
        from: String,
    },

    #[error("operation '{operation}': '{to}' is an initial state of '{typestate}' and cannot be a destination")]
    ToInitial {
        operation: String,
        typestate: String,
        to: String,
    },

    #[error("operation '{operation}' is a transition from '{from}' of '{typestate}' but names no destination state")]
    MissingDestination {
        operation: String,
        typestate: String,
        from: String,
    },

    #[error("operation '{operation}': undeclared transition {from} -> {to} in '{typestate}'; valid from '{from}': {}", alternatives(.valid))]
    UndeclaredTransition {
        operation: String,
        typestate: String,
        from: String,
        to: String,
        valid: Vec<String>,
    },

    #[error("operation '{operation}': undeclared bridge {from} -> {to_graph}.{to_state} in '{typestate}'; valid from '{from}': {}", alternatives(.valid))]
    UndeclaredBridge {
        operation: String,
        typestate: String,
        from: String,
        to_graph: String,
        to_state: String,
        valid: Vec<String>,
    },

    #[error("operation '{operation}' takes state '{state}' of '{typestate}' but is marked neither transition nor read-only")]
    Unmarked {
        operation: String,
        typestate: String,
        state: String,
    },

    #[error("operation '{operation}' declares out-of-band failure ({}); express failure as a branch destination instead", .channels.join(", "))]
    FailureChannel {
        operation: String,
        channels: Vec<String>,
    },

    #[error("operation '{operation}' borrows '{from}', but '{typestate}' consumes its state on transition")]
    BorrowedSource {
        operation: String,
        typestate: String,
        from: String,
    },
}

impl TransitionViolation {
    /// The legal alternatives carried by transition and bridge failures.
    pub fn valid_alternatives(&self) -> &[String] {
        match self {
            Self::UndeclaredTransition { valid, .. } | Self::UndeclaredBridge { valid, .. } => {
                valid
            }
            _ => &[],
        }
    }
}
