use thiserror::Error;

/// A graph whose declarations cannot be turned into Rust items.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodegenError {
    #[error("typestate '{typestate}': '{text}' is not a valid Rust {what}: {reason}")]
    InvalidSyntax {
        typestate: String,
        what: &'static str,
        text: String,
        reason: String,
    },
}
