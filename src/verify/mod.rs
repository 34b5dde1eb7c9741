//! Project-wide source verifier.
//!
//! The verifier derives typestate graphs straight from Rust source text and
//! audits every marked and unmarked operation against them, without compiling
//! the project. It runs in two passes:
//!
//! 1. every unit is parsed in parallel into the graphs it declares and the
//!    operations it defines;
//! 2. all graphs are registered, then every operation is checked against
//!    the complete set, so declaration order across files does not matter.
//!
//! Protocol violations are accumulated into a [`VerifyReport`]. A unit that
//! cannot be read or parsed aborts the run with a [`VerifierIoError`].

mod audit;
mod config;
mod error;
mod report;
mod scan;
mod syntax;

pub use config::VerifierConfig;
pub use error::VerifierIoError;
pub use report::{Diagnostic, Severity, VerifyReport};
pub use scan::{ScannedOperation, UnitScan};

use crate::registry::{RegistrationError, Registry};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared flag that stops a run before its next unit.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source verifier over a set of files and directories.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::PathBuf;
/// use typestates::verify::{Verifier, VerifierConfig};
///
/// let report = Verifier::new(VerifierConfig::default())
///     .verify(&[PathBuf::from("src")])
///     .unwrap();
/// println!("{}", report.summary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifierConfig,
    cancel: CancelToken,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// First pass: parse every unit under `paths`, in file order.
    pub fn scan(&self, paths: &[PathBuf]) -> Result<Vec<UnitScan>, VerifierIoError> {
        let files = scan::collect_files(paths, &self.config)?;
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let workers = self.config.workers(files.len());
        let chunk = files.len().div_ceil(workers);
        debug!(files = files.len(), workers, "scanning units");

        // Index of the earliest chunk that has failed so far.
        let first_failed = AtomicUsize::new(usize::MAX);
        let results: Vec<Result<Vec<UnitScan>, VerifierIoError>> = std::thread::scope(|scope| {
            let first_failed = &first_failed;
            let handles: Vec<_> = files
                .chunks(chunk)
                .enumerate()
                .map(|(index, units)| {
                    scope.spawn(move || self.scan_chunk(index, units, first_failed))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let mut units = Vec::with_capacity(files.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(chunk) => units.extend(chunk),
                // A later chunk stopped because an earlier one failed.
                Err(VerifierIoError::Cancelled) if !self.cancel.is_cancelled() => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None if self.cancel.is_cancelled() => Err(VerifierIoError::Cancelled),
            None => Ok(units),
        }
    }

    /// Scan one chunk in order. Chunks before the earliest failed one always
    /// run to their own first error, so the reported error is the one in the
    /// earliest file whatever the scheduling.
    fn scan_chunk(
        &self,
        index: usize,
        files: &[PathBuf],
        first_failed: &AtomicUsize,
    ) -> Result<Vec<UnitScan>, VerifierIoError> {
        let mut units = Vec::with_capacity(files.len());
        for file in files {
            if self.cancel.is_cancelled() || first_failed.load(Ordering::SeqCst) < index {
                return Err(VerifierIoError::Cancelled);
            }
            let unit = std::fs::read_to_string(file)
                .map_err(|e| VerifierIoError::read(file, &e))
                .and_then(|text| scan::scan_unit(file, &text, &self.config));
            match unit {
                Ok(unit) => {
                    debug!(
                        file = %file.display(),
                        typestates = unit.graphs.len(),
                        operations = unit.operations.len(),
                        "scanned unit"
                    );
                    units.push(unit);
                }
                Err(err) => {
                    first_failed.fetch_min(index, Ordering::SeqCst);
                    return Err(err);
                }
            }
        }
        Ok(units)
    }

    /// Scan `paths` and audit every operation found.
    pub fn verify(&self, paths: &[PathBuf]) -> Result<VerifyReport, VerifierIoError> {
        let mut report = VerifyReport::new(Utc::now());
        let units = self.scan(paths)?;
        report.files_checked = units.len();

        let mut registry = Registry::new();
        for graph in units.iter().flat_map(|unit| &unit.graphs) {
            if let Err(err) = registry.register(graph.clone()) {
                report.error(graph.location.clone(), err);
            }
        }
        for (graph, bridge) in registry.pending_bridges() {
            let unresolved = RegistrationError::UnresolvedBridge {
                graph: graph.name.clone(),
                bridge: bridge.to_string(),
                to_graph: bridge.to_graph.clone(),
            };
            report.error(bridge.location.clone(), unresolved);
        }

        for unit in &units {
            for op in &unit.operations {
                let found = audit::audit(&registry, &unit.module, op);
                if found.checked {
                    report.transitions_checked += 1;
                }
                for violation in found.errors {
                    report.error(Some(op.location.clone()), violation);
                }
                for violation in found.warnings {
                    report.warning(Some(op.location.clone()), violation);
                }
            }
        }

        let report = report.finish();
        info!(
            files = report.files_checked,
            transitions = report.transitions_checked,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "verification finished"
        );
        Ok(report)
    }

    /// Scan `paths` and register every typestate found, for rendering or
    /// code generation. Registration failures are returned, not reported.
    pub fn collect(&self, paths: &[PathBuf]) -> crate::error::Result<Registry> {
        let mut registry = Registry::new();
        for unit in self.scan(paths)? {
            for graph in unit.graphs {
                registry.register(graph)?;
            }
        }
        Ok(registry)
    }
}
