//! Crate-wide error type.
//!
//! Each component owns its own error enum; [`Error`] wraps them so callers
//! can propagate any of them with `?`.

use crate::codegen::CodegenError;
use crate::core::GraphInvariantError;
use crate::registry::RegistrationError;
use crate::spec::SpecificationError;
use crate::validate::TransitionViolation;
use crate::verify::VerifierIoError;
use thiserror::Error;

/// Any failure surfaced by the typestate toolchain.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Malformed specification text.
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    /// Graph parsed but breaks a structural invariant.
    #[error(transparent)]
    Invariant(#[from] GraphInvariantError),

    /// Graph conflicts with the registry.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Operation not permitted by its typestate.
    #[error(transparent)]
    Violation(#[from] TransitionViolation),

    /// Verification run aborted.
    #[error(transparent)]
    Verifier(#[from] VerifierIoError),

    /// Helper types could not be generated.
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

pub type Result<T> = std::result::Result<T, Error>;
