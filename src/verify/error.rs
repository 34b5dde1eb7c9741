//! Errors that abort a verification run.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A failure that stops the whole run. Unlike protocol violations these are
/// never accumulated: a unit that cannot be read or parsed makes the audit
/// unsound.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifierIoError {
    #[error("{}: no such file or directory", .path.display())]
    MissingPath { path: PathBuf },

    #[error("{}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("{}:{line}: {reason}", .path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{}: invalid verifier configuration: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("verification cancelled")]
    Cancelled,
}

impl VerifierIoError {
    pub(crate) fn read(path: &Path, err: &std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn syntax(path: &Path, err: &syn::Error) -> Self {
        Self::Syntax {
            path: path.to_path_buf(),
            line: err.span().start().line,
            reason: err.to_string(),
        }
    }
}
