//! `typestates` command line: verify a project, draw its protocols, or
//! generate helper types for them.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use typestates::codegen;
use typestates::diagram::{Diagram, Layout, RoutingMode};
use typestates::verify::{Verifier, VerifierConfig};

/// Declarative typestate protocols for Rust projects.
#[derive(Parser, Debug)]
#[command(name = "typestates", author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verifier settings (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check every operation in the given files and directories against the
    /// typestates they declare.
    Verify {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Report format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Worker threads (0 = one per core).
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print the declared typestates as Graphviz DOT.
    Dot {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// One digraph per typestate instead of one cluster each.
        #[arg(long)]
        separate: bool,

        /// Edge routing: spline, polyline, curved, ortho or line.
        #[arg(long, value_name = "MODE", default_value = "spline")]
        splines: RoutingMode,
    },

    /// Print helper enums and traits for the declared typestates.
    Codegen {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else if cli.verbose {
        "typestates=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env("TYPESTATES_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => VerifierConfig::load(path)?,
        None => VerifierConfig::default(),
    };

    match cli.command {
        Commands::Verify {
            paths,
            format,
            jobs,
        } => {
            if let Some(jobs) = jobs {
                config = config.jobs(jobs);
            }
            let report = match Verifier::new(config).verify(&paths) {
                Ok(report) => report,
                Err(err) => {
                    println!("ERROR: {err}");
                    return Ok(ExitCode::FAILURE);
                }
            };

            match format {
                Format::Text => {
                    for diagnostic in report.diagnostics() {
                        println!("{diagnostic}");
                    }
                    println!("{}", report.summary());
                }
                Format::Json => {
                    let json = serde_json::to_string_pretty(&report)
                        .context("failed to serialize report")?;
                    println!("{json}");
                }
            }

            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Dot {
            paths,
            separate,
            splines,
        } => {
            let registry = Verifier::new(config).collect(&paths)?;
            let layout = if separate {
                Layout::Separate
            } else {
                Layout::Unified
            };
            print!(
                "{}",
                Diagram::new(registry.graphs())
                    .layout(layout)
                    .routing(splines)
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Codegen { paths } => {
            let registry = Verifier::new(config).collect(&paths)?;
            let tokens = codegen::generate_all(registry.graphs())?;
            println!("{tokens}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
