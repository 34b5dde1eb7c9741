//! End-to-end runs over small on-disk projects: verify, then draw and
//! generate from the collected registry.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use typestates::codegen;
use typestates::diagram::{Diagram, Layout};
use typestates::verify::{Severity, Verifier, VerifierConfig, VerifierIoError};

const AUTH: &str = r#"
typestate! {
    Auth {
        states { Pending, Granted, Denied }
        initial: Pending
        terminal: Denied
        transitions {
            Pending -> (Granted | Denied) as Decision
        }
        bridges {
            Granted -> Session.Active
        }
    }
}

#[transition]
fn decide(a: Pending) -> Decision { todo!() }

#[transition]
fn start(a: Granted) -> Active { todo!() }

#[read_only]
fn user(a: &Granted) -> String { todo!() }
"#;

const SESSION: &str = r#"
typestate! {
    Session {
        states { Active, Idle, Ended }
        terminal: Ended
        transitions {
            Active -> Idle
            Idle -> Active
            * -> Ended
        }
    }
}

#[transition]
fn pause(s: Active) -> Idle { todo!() }

#[transition]
fn end(s: Idle) -> Ended { todo!() }
"#;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    dir
}

fn root(dir: &TempDir) -> Vec<PathBuf> {
    vec![dir.path().to_path_buf()]
}

#[test]
fn protocol_abiding_project_verifies() {
    let dir = project(&[("src/auth.rs", AUTH), ("src/session.rs", SESSION)]);
    let report = Verifier::default().verify(&root(&dir)).unwrap();

    assert!(report.is_success(), "{:#?}", report.errors);
    assert!(report.warnings.is_empty());
    assert_eq!(report.summary(), "Checked 2 files, 4 transitions");
}

#[test]
fn violations_are_reported_with_locations() {
    let broken = format!(
        "{SESSION}\n#[transition]\nfn revive(s: Ended) -> Active {{ todo!() }}\n\n#[transition]\nfn skip(s: Active) -> Denied {{ todo!() }}\n"
    );
    let dir = project(&[("auth.rs", AUTH), ("session.rs", &broken)]);
    let report = Verifier::default().verify(&root(&dir)).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.errors.len(), 2);
    let lines: Vec<String> = report.diagnostics().map(ToString::to_string).collect();
    assert!(lines.iter().all(|l| l.starts_with("ERROR: ")));
    assert!(lines.iter().any(|l| l.contains("'revive'") && l.contains("terminal")));
    assert!(lines.iter().any(|l| l.contains("'skip'") && l.contains("Auth")));
    assert!(report
        .errors
        .iter()
        .all(|d| d.severity == Severity::Error && d.location.is_some()));
}

#[test]
fn missing_path_fails_the_run() {
    let dir = project(&[("auth.rs", AUTH)]);
    let missing = dir.path().join("nowhere");
    let err = Verifier::default().verify(&[missing]).unwrap_err();
    assert!(matches!(err, VerifierIoError::MissingPath { .. }));
}

#[test]
fn excluded_directories_are_skipped() {
    let dir = project(&[
        ("src/auth.rs", AUTH),
        ("src/session.rs", SESSION),
        ("vendor/broken.rs", "fn nope( {"),
    ]);
    let config = VerifierConfig::default().exclude(["vendor"]);
    let report = Verifier::new(config).verify(&root(&dir)).unwrap();
    assert_eq!(report.files_checked, 2);
}

#[test]
fn collected_graphs_render_and_generate() {
    let dir = project(&[("auth.rs", AUTH), ("session.rs", SESSION)]);
    let registry = Verifier::default().collect(&root(&dir)).unwrap();
    assert_eq!(registry.len(), 2);

    let dot = Diagram::new(registry.graphs()).to_string();
    assert!(dot.contains("\"Auth.Granted\" -> \"Session.Active\""));
    assert!(dot.contains("label=\"Decision\""));

    let separate = Diagram::new(registry.graphs())
        .layout(Layout::Separate)
        .to_string();
    assert_eq!(separate.matches("digraph ").count(), 2);

    let code = codegen::generate_all(registry.graphs()).unwrap();
    let file: syn::File = syn::parse2(code).unwrap();
    let enums: Vec<String> = file
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Enum(e) => Some(e.ident.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(enums, vec!["AuthState", "Decision", "SessionState"]);
}
