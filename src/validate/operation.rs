//! Descriptors of operations submitted for validation.

use crate::core::Location;
use serde::{Deserialize, Serialize};

/// How an operation declared itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Moves its source state to one of its destinations.
    Transition,
    /// Inspects a state without changing it.
    ReadOnly,
    /// Carries no marker.
    Unmarked,
}

/// Where a transition leads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// Explicit destination states.
    States(Vec<String>),
    /// A branch result type, expanded to its member states before checking.
    Branch(String),
}

/// An operation as declared by the host program.
///
/// # Example
///
/// ```rust
/// use typestates::validate::{Operation, OperationKind};
///
/// let open = Operation::transition("open", "Closed", ["Open"]).in_module("fs");
/// assert_eq!(open.kind, OperationKind::Transition);
///
/// let size = Operation::read_only("size", "&Open");
/// assert_eq!(size.kind, OperationKind::ReadOnly);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    /// Type of the state the operation receives, as written.
    pub source: String,
    pub destination: Destination,
    pub kind: OperationKind,
    pub module: String,
    pub location: Option<Location>,
    /// Out-of-band failure channels the operation declares. `None` means
    /// undeclared; validation annotates it as `Some(vec![])`.
    pub failure_channels: Option<Vec<String>>,
}

impl Operation {
    fn new(name: impl Into<String>, source: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: Destination::States(Vec::new()),
            kind,
            module: String::new(),
            location: None,
            failure_channels: None,
        }
    }

    pub fn transition<I, S>(name: impl Into<String>, source: impl Into<String>, to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destination: Destination::States(to.into_iter().map(Into::into).collect()),
            ..Self::new(name, source, OperationKind::Transition)
        }
    }

    /// A transition returning a branch result type.
    pub fn branching(
        name: impl Into<String>,
        source: impl Into<String>,
        branch_type: impl Into<String>,
    ) -> Self {
        Self {
            destination: Destination::Branch(branch_type.into()),
            ..Self::new(name, source, OperationKind::Transition)
        }
    }

    pub fn read_only(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, source, OperationKind::ReadOnly)
    }

    pub fn unmarked(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, source, OperationKind::Unmarked)
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn fails_with<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure_channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }
}
