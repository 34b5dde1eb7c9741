//! Transitions and bridges between states.

use super::location::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source marker of a wildcard transition.
pub const WILDCARD: &str = "*";

/// A declared, permitted move from one state to one or more states.
///
/// `from` is a state base name, or [`WILDCARD`] when the transition applies
/// to every non-terminal state of the graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: Vec<String>,
    pub is_wildcard: bool,
    /// Result type wrapping a branching destination list.
    pub branch_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Transition {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            is_wildcard: false,
            branch_type: None,
            location: None,
        }
    }

    pub fn wildcard(to: impl Into<String>) -> Self {
        Self {
            from: WILDCARD.to_string(),
            is_wildcard: true,
            ..Self::new(WILDCARD, to)
        }
    }

    pub fn branching<I, S>(from: impl Into<String>, to: I, branch_type: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: from.into(),
            to: to.into_iter().map(Into::into).collect(),
            is_wildcard: false,
            branch_type: Some(branch_type.into()),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_branching(&self) -> bool {
        self.to.len() > 1
    }

    pub fn targets(&self, state: &str) -> bool {
        self.to.iter().any(|to| to == state)
    }

    /// Structural equality used when merging extensions: same source, same
    /// destination set and same wildcard flag.
    pub fn same_edge(&self, other: &Transition) -> bool {
        if self.from != other.from || self.is_wildcard != other.is_wildcard {
            return false;
        }
        let mut mine: Vec<&String> = self.to.iter().collect();
        let mut theirs: Vec<&String> = other.to.iter().collect();
        mine.sort();
        mine.dedup();
        theirs.sort();
        theirs.dedup();
        mine == theirs
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ", self.from)?;
        if self.is_branching() {
            write!(f, "({})", self.to.join(" | "))?;
        } else {
            write!(f, "{}", self.to.join(" | "))?;
        }
        if let Some(branch) = &self.branch_type {
            write!(f, " as {branch}")?;
        }
        Ok(())
    }
}

/// A transition whose destination state belongs to another graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bridge {
    pub from: String,
    pub to_graph: String,
    pub to_state: String,
    /// Leading qualifier segments as written (`net.io` in `net.io.Session.Active`).
    /// Display metadata only; never resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Bridge {
    pub fn new(
        from: impl Into<String>,
        to_graph: impl Into<String>,
        to_state: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to_graph: to_graph.into(),
            to_state: to_state.into(),
            module: None,
            location: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn same_edge(&self, other: &Bridge) -> bool {
        self.from == other.from && self.to_graph == other.to_graph && self.to_state == other.to_state
    }

    /// `Graph.State`, prefixed by the module qualifier when one was written.
    pub fn qualified_destination(&self) -> String {
        match &self.module {
            Some(module) => format!("{module}.{}.{}", self.to_graph, self.to_state),
            None => format!("{}.{}", self.to_graph, self.to_state),
        }
    }
}

impl fmt::Display for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.qualified_destination())
    }
}
