//! The typestate specification language.
//!
//! Turns declarative text blocks into validated [`TypestateGraph`]s. Grammar
//! errors surface as [`SpecificationError`]s carrying a location; graphs that
//! parse but break a structural invariant surface as
//! [`GraphInvariantError`](crate::core::GraphInvariantError).
//!
//! [`TypestateGraph`]: crate::core::TypestateGraph

mod error;
mod lexer;
mod parser;

pub use error::SpecificationError;
pub use parser::{parse_typestate, parse_typestates, SpecParser};
