//! Tool descriptors
//!
//! A descriptor is built once by discovery from static inspection and never
//! changes afterwards; there are no setters, only consuming builders.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::deps::Requirement;

/// Everything the orchestrator knows about one discovered tool
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    name: String,
    location: PathBuf,
    description: String,
    dependencies: Vec<Requirement>,
    manifest: Option<PathBuf>,
    is_package: bool,
}

impl ToolDescriptor {
    /// Create a descriptor for the entry file at `location`
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>, is_package: bool) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            description: String::new(),
            dependencies: Vec::new(),
            manifest: None,
            is_package,
        }
    }

    /// Set the one-line description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the tool-local requirements
    pub fn with_dependencies(mut self, dependencies: Vec<Requirement>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Record the manifest the requirements came from
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry file invoked on `run`
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dependencies(&self) -> &[Requirement] {
        &self.dependencies
    }

    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Directory tool with its own manifest slot, as opposed to a single file
    pub fn is_package(&self) -> bool {
        self.is_package
    }

    /// Extension of the entry file, used to pick an interpreter
    pub fn extension(&self) -> Option<&str> {
        self.location.extension().and_then(|e| e.to_str())
    }

    /// Serializable summary for listings
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            kind: if self.is_package { "package" } else { "file" },
            dependencies: self.dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Flat view of a descriptor for `list --json`
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub location: PathBuf,
    pub kind: &'static str,
    pub dependencies: Vec<String>,
}
