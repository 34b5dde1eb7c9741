//! Verifier settings.

use super::error::VerifierIoError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which files to scan and which markers classify operations.
///
/// Loaded from TOML; missing keys keep their defaults.
///
/// ```toml
/// extensions = ["rs"]
/// exclude = ["target", "vendor"]
/// jobs = 4
/// transition_markers = ["transition"]
/// read_only_markers = ["read_only", "not_a_transition"]
/// macros = ["typestate"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// File extensions treated as source units.
    pub extensions: Vec<String>,
    /// Directory names never descended into. Hidden directories are always
    /// skipped.
    pub exclude: Vec<String>,
    /// Worker threads. `0` uses the available parallelism.
    pub jobs: usize,
    pub transition_markers: Vec<String>,
    pub read_only_markers: Vec<String>,
    /// Macro names whose bodies declare typestates.
    pub macros: Vec<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["rs".into()],
            exclude: vec!["target".into()],
            jobs: 0,
            transition_markers: vec!["transition".into()],
            read_only_markers: vec!["read_only".into(), "not_a_transition".into()],
            macros: vec!["typestate".into()],
        }
    }
}

impl VerifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(path: &Path, text: &str) -> Result<Self, VerifierIoError> {
        toml::from_str(text).map_err(|e| VerifierIoError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, VerifierIoError> {
        let text = std::fs::read_to_string(path).map_err(|e| VerifierIoError::read(path, &e))?;
        Self::from_toml(path, &text)
    }

    pub fn extensions(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn transition_marker(mut self, name: impl Into<String>) -> Self {
        self.transition_markers.push(name.into());
        self
    }

    pub fn read_only_marker(mut self, name: impl Into<String>) -> Self {
        self.read_only_markers.push(name.into());
        self
    }

    /// Effective worker count for `units` files.
    pub(crate) fn workers(&self, units: usize) -> usize {
        let jobs = if self.jobs == 0 {
            std::thread::available_parallelism().map_or(1, usize::from)
        } else {
            self.jobs
        };
        jobs.clamp(1, units.max(1))
    }
}
