//! Explicit analysis context.
//!
//! An [`Analysis`] owns the registry for one run. Specifications are declared
//! into it first; operations are validated against it afterwards. Nothing is
//! kept in global state, so independent runs never observe each other.

use crate::core::TypestateGraph;
use crate::error::Result;
use crate::registry::Registry;
use crate::spec::SpecParser;
use crate::validate::{validate_operation, Operation, Validated};
use std::path::Path;
use tracing::info;

/// Registry plus the declaring context of the specifications fed into it.
///
/// # Example
///
/// ```rust
/// use stillwater::validation::Validation;
/// use typestates::analysis::Analysis;
/// use typestates::validate::Operation;
///
/// let mut analysis = Analysis::new();
/// analysis
///     .declare("fs", "File { states { Closed, Open } transitions { Closed -> Open } }")
///     .unwrap();
/// analysis.finish().unwrap();
///
/// let open = Operation::transition("open", "Closed", ["Open"]).in_module("fs");
/// assert!(matches!(analysis.validate(&open), Validation::Success(_)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    registry: Registry,
}

impl Analysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every block in `source` as declared by `module` and register it.
    /// Returns the names of the registered typestates.
    pub fn declare(&mut self, module: &str, source: &str) -> Result<Vec<String>> {
        let graphs = SpecParser::new().module(module).parse_all(source)?;
        self.register_all(graphs)
    }

    /// Like [`Analysis::declare`], recording `file` in every location.
    pub fn declare_file(
        &mut self,
        module: &str,
        file: impl AsRef<Path>,
        source: &str,
    ) -> Result<Vec<String>> {
        let graphs = SpecParser::new()
            .module(module)
            .file(file)
            .parse_all(source)?;
        self.register_all(graphs)
    }

    pub fn register(&mut self, graph: TypestateGraph) -> Result<&TypestateGraph> {
        self.registry.register(graph)
    }

    /// Close the registration phase. Every bridge must now resolve.
    pub fn finish(&self) -> Result<()> {
        self.registry.check_deferred_bridges()?;
        info!(typestates = self.registry.len(), "registration complete");
        Ok(())
    }

    pub fn validate(&self, operation: &Operation) -> Validated {
        validate_operation(&self.registry, operation)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    fn register_all(&mut self, graphs: Vec<TypestateGraph>) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(graphs.len());
        for graph in graphs {
            names.push(self.registry.register(graph)?.name.clone());
        }
        Ok(names)
    }
}
