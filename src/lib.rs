//! Typestates: declarative protocols for Rust types
//!
//! A typestate is a set of types (its states) plus the moves allowed between
//! them. This crate parses typestate declarations, keeps them in a registry,
//! checks operations against them, and renders them as diagrams or helper
//! types. The graph model is pure data; everything that reads files lives in
//! [`verify`].
//!
//! # Core Concepts
//!
//! - **State identity**: states are compared by base name, so `Empty<T>`,
//!   `&mut Empty<u8>` and `crate::fs::Empty` are the same state
//! - **Transitions**: explicit, branching (`A -> B | C as Outcome`) and
//!   wildcard (`* -> Failed`, from any non-terminal state)
//! - **Bridges**: moves from one typestate into another
//! - **Validation**: every violation of an operation is reported at once
//!
//! # Example
//!
//! ```rust
//! use stillwater::validation::Validation;
//! use typestates::{Analysis, Operation};
//!
//! let mut analysis = Analysis::new();
//! analysis
//!     .declare(
//!         "net",
//!         "Connection {
//!             states { Disconnected, Connected, Closed }
//!             initial: Disconnected
//!             terminal: Closed
//!             transitions {
//!                 Disconnected -> Connected
//!                 * -> Closed
//!             }
//!         }",
//!     )
//!     .unwrap();
//! analysis.finish().unwrap();
//!
//! let close = Operation::transition("close", "Connected", ["Closed"]).in_module("net");
//! assert!(matches!(analysis.validate(&close), Validation::Success(_)));
//!
//! let reopen = Operation::transition("reopen", "Closed", ["Connected"]).in_module("net");
//! assert!(matches!(analysis.validate(&reopen), Validation::Failure(_)));
//! ```

pub mod analysis;
pub mod codegen;
pub mod core;
pub mod diagram;
pub mod error;
pub mod registry;
pub mod spec;
pub mod validate;
pub mod verify;

// Re-export commonly used types
pub use analysis::Analysis;
pub use crate::core::{base_name, Bridge, GraphFlags, Location, State, Transition, TypestateGraph};
pub use error::{Error, Result};
pub use registry::Registry;
pub use spec::{parse_typestate, parse_typestates};
pub use validate::{validate_operation, Operation, TransitionViolation, ValidatedOperation};
pub use verify::{Verifier, VerifierConfig, VerifyReport};
