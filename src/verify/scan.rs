//! Source unit discovery and the first verification pass.
//!
//! Each unit is parsed on its own: it yields the typestates it declares and
//! every function or method it defines, with no reference to other units.

use super::config::VerifierConfig;
use super::error::VerifierIoError;
use super::syntax::{location, parse_declarations, render_as};
use crate::core::{Location, TypestateGraph};
use crate::validate::OperationKind;
use std::path::{Path, PathBuf};
use syn::visit::{self, Visit};
use syn::{Attribute, FnArg, ImplItem, ItemFn, ItemImpl, ReturnType, Signature};
use walkdir::{DirEntry, WalkDir};

/// A function or method found in a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedOperation {
    pub name: String,
    pub kind: OperationKind,
    /// Type of the first parameter. A receiver is spelled through its impl type.
    pub source: String,
    pub returns: Option<String>,
    pub location: Location,
}

/// Everything one unit contributes to the second pass.
#[derive(Debug, Clone)]
pub struct UnitScan {
    pub file: PathBuf,
    /// Module identity used by the sealed rule. One unit is one module.
    pub module: String,
    pub graphs: Vec<TypestateGraph>,
    pub operations: Vec<ScannedOperation>,
}

/// Files under `paths` to scan, sorted and without duplicates.
///
/// Explicitly named files are always included. Directories are walked,
/// skipping hidden and excluded directories and keeping files with a
/// configured extension.
pub(crate) fn collect_files(
    paths: &[PathBuf],
    config: &VerifierConfig,
) -> Result<Vec<PathBuf>, VerifierIoError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            return Err(VerifierIoError::MissingPath { path: path.clone() });
        }
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_excluded(e, config)))
        {
            let entry = entry.map_err(|e| VerifierIoError::Read {
                path: e.path().map_or_else(|| path.clone(), Path::to_path_buf),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_file() && has_extension(entry.path(), config) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_excluded(entry: &DirEntry, config: &VerifierConfig) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|s| config.exclude.iter().any(|ex| ex == s))
            .unwrap_or(false)
}

fn has_extension(path: &Path, config: &VerifierConfig) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| config.extensions.iter().any(|e| e == ext))
        .unwrap_or(false)
}

/// Parse one unit. Any syntax error, in the file or in a typestate block,
/// is returned as is.
pub(crate) fn scan_unit(
    path: &Path,
    text: &str,
    config: &VerifierConfig,
) -> Result<UnitScan, VerifierIoError> {
    let file = syn::parse_file(text).map_err(|e| VerifierIoError::syntax(path, &e))?;

    let mut visitor = UnitVisitor {
        config,
        graphs: Vec::new(),
        operations: Vec::new(),
        error: None,
    };
    visitor.visit_file(&file);
    if let Some(err) = visitor.error {
        return Err(VerifierIoError::syntax(path, &err));
    }

    let module = path.display().to_string();
    let graphs = visitor
        .graphs
        .into_iter()
        .map(|graph| attribute_graph(graph, path, &module))
        .collect();
    let operations = visitor
        .operations
        .into_iter()
        .map(|op| ScannedOperation {
            location: op.location.with_file(path),
            ..op
        })
        .collect();

    Ok(UnitScan {
        file: path.to_path_buf(),
        module,
        graphs,
        operations,
    })
}

fn attribute_graph(mut graph: TypestateGraph, path: &Path, module: &str) -> TypestateGraph {
    graph.module = module.to_string();
    graph.location = graph.location.map(|l| l.with_file(path));
    for transition in &mut graph.transitions {
        transition.location = transition.location.take().map(|l| l.with_file(path));
    }
    for bridge in &mut graph.bridges {
        bridge.location = bridge.location.take().map(|l| l.with_file(path));
    }
    graph
}

struct UnitVisitor<'a> {
    config: &'a VerifierConfig,
    graphs: Vec<TypestateGraph>,
    operations: Vec<ScannedOperation>,
    error: Option<syn::Error>,
}

impl UnitVisitor<'_> {
    fn record(&mut self, attrs: &[Attribute], sig: &Signature, self_ty: Option<&str>) {
        let Some(first) = sig.inputs.first() else {
            return;
        };
        let source = match first {
            FnArg::Receiver(receiver) => match self_ty {
                Some(ty) => render_as(&receiver.ty, Some(ty)),
                None => return,
            },
            FnArg::Typed(arg) => render_as(&arg.ty, self_ty),
        };
        let returns = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(render_as(ty, self_ty)),
        };
        self.operations.push(ScannedOperation {
            name: sig.ident.to_string(),
            kind: self.classify(attrs),
            source,
            returns,
            location: location(sig.ident.span()),
        });
    }

    /// Markers match on the last path segment, so `#[typestates::transition]`
    /// counts as `#[transition]`.
    fn classify(&self, attrs: &[Attribute]) -> OperationKind {
        let marker = |names: &[String]| {
            attrs.iter().any(|attr| {
                attr.path()
                    .segments
                    .last()
                    .is_some_and(|seg| names.iter().any(|n| seg.ident == n.as_str()))
            })
        };
        if marker(&self.config.transition_markers) {
            OperationKind::Transition
        } else if marker(&self.config.read_only_markers) {
            OperationKind::ReadOnly
        } else {
            OperationKind::Unmarked
        }
    }
}

impl<'ast> Visit<'ast> for UnitVisitor<'_> {
    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        if self.error.is_some() {
            return;
        }
        let declares = mac
            .path
            .segments
            .last()
            .is_some_and(|seg| self.config.macros.iter().any(|m| seg.ident == m.as_str()));
        if declares {
            match parse_declarations(mac.tokens.clone()) {
                Ok(graphs) => self.graphs.extend(graphs),
                Err(err) => self.error = Some(err),
            }
        }
    }

    fn visit_item_fn(&mut self, item: &'ast ItemFn) {
        self.record(&item.attrs, &item.sig, None);
        visit::visit_item_fn(self, item);
    }

    fn visit_item_impl(&mut self, item: &'ast ItemImpl) {
        let self_ty = render_as(&item.self_ty, None);
        for impl_item in &item.items {
            if let ImplItem::Fn(method) = impl_item {
                self.record(&method.attrs, &method.sig, Some(&self_ty));
            }
        }
        visit::visit_item_impl(self, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const UNIT: &str = r#"
        typestate! {
            File {
                states { Closed, Open }
                transitions { Closed -> Open }
            }
        }

        #[transition]
        fn open(file: Closed) -> Open {
            Open
        }

        impl Open {
            #[typestates::read_only]
            fn size(&self) -> u64 {
                0
            }

            fn peek(&self) {}
        }
    "#;

    #[test]
    fn unit_yields_graphs_and_classified_operations() {
        let unit = scan_unit(Path::new("src/file.rs"), UNIT, &VerifierConfig::default()).unwrap();
        assert_eq!(unit.graphs.len(), 1);
        assert_eq!(unit.graphs[0].module, "src/file.rs");

        let ops: Vec<_> = unit
            .operations
            .iter()
            .map(|op| (op.name.as_str(), op.kind, op.source.as_str()))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("open", OperationKind::Transition, "Closed"),
                ("size", OperationKind::ReadOnly, "&Open"),
                ("peek", OperationKind::Unmarked, "&Open"),
            ]
        );
        assert_eq!(unit.operations[0].returns.as_deref(), Some("Open"));
        assert_eq!(unit.operations[0].location.line, 10);
        assert_eq!(
            unit.operations[0].location.file.as_deref(),
            Some(Path::new("src/file.rs"))
        );
    }

    #[test]
    fn syntax_errors_carry_file_and_line() {
        let err = scan_unit(Path::new("bad.rs"), "fn broken( {", &VerifierConfig::default())
            .unwrap_err();
        assert!(matches!(err, VerifierIoError::Syntax { ref path, .. } if path == Path::new("bad.rs")));

        let text = "typestate! {\n    File {\n        states { A, B }\n        transitions { A -> (A | B) }\n    }\n}\n";
        let err = scan_unit(Path::new("decls.rs"), text, &VerifierConfig::default()).unwrap_err();
        match err {
            VerifierIoError::Syntax { line, reason, .. } => {
                assert_eq!(line, 4);
                assert!(reason.contains("as Name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn walk_skips_hidden_and_excluded_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for file in ["src/lib.rs", "src/notes.txt", "target/gen.rs", ".hidden/x.rs", "b/main.rs"] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }

        let files = collect_files(&[root.to_path_buf()], &VerifierConfig::default()).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("b/main.rs"), PathBuf::from("src/lib.rs")]
        );
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = collect_files(&[PathBuf::from("/no/such/dir")], &VerifierConfig::default())
            .unwrap_err();
        assert!(matches!(err, VerifierIoError::MissingPath { .. }));
    }
}
