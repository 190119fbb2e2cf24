//! Discovery Engine - build the tool registry from a tools root
//!
//! Layout rules, for a recognised extension `ext`:
//! - `<root>/<stem>.<ext>` is a single-file tool named `<stem>`
//! - `<root>/<dir>/` is a package tool named `<dir>` whose entry is
//!   `<dir>.<ext>`, else `main.<ext>`, else the only `*.<ext>` file in it
//!
//! Directories without an entry are skipped and never descended into.
//! Names starting with `.` or `_`, and names matching an ignore pattern,
//! are not candidates. Only file contents are read; nothing is executed.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::{debug, info, warn};

use crate::deps::load_manifest;
use crate::error::{Result, ToolboxError};

use super::descriptor::ToolDescriptor;
use super::header::extract_description;
use super::registry::ToolRegistry;

/// Settings that decide what counts as a tool
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Entry file extensions, without the dot
    pub extensions: Vec<String>,
    /// File name of the tool-local dependency manifest
    pub manifest_name: String,
    /// Entries to skip entirely
    pub ignore: Vec<Pattern>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            manifest_name: "requirements.txt".to_string(),
            ignore: Vec::new(),
        }
    }
}

impl DiscoveryOptions {
    /// Compile ignore patterns, reporting the first invalid one
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ToolboxError::Discovery {
                    path: PathBuf::from(p),
                    reason: format!("invalid ignore pattern: {}", e),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    fn is_entry_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn is_skipped(&self, file_name: &str) -> bool {
        file_name.starts_with('.') || file_name.starts_with('_') || self.ignore.iter().any(|p| p.matches(file_name))
    }
}

/// Scan `root` one level deep and build a fresh registry
pub fn discover(root: &Path, options: &DiscoveryOptions) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    if !root.exists() {
        warn!("Tools root {} does not exist", root.display());
        return Ok(registry);
    }
    if !root.is_dir() {
        return Err(ToolboxError::Discovery {
            path: root.to_path_buf(),
            reason: "tools root is not a directory".to_string(),
        });
    }

    for path in sorted_entries(root)? {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!("Skipping non UTF-8 entry {}", path.display());
            continue;
        };
        if options.is_skipped(file_name) {
            debug!("Skipping {}", path.display());
            continue;
        }

        let descriptor = if path.is_dir() {
            match package_entry(&path, file_name, options)? {
                Some(entry) => describe_package(file_name, &path, &entry, options)?,
                None => {
                    debug!("No entry file in {}, not a tool", path.display());
                    continue;
                }
            }
        } else if options.is_entry_file(&path) {
            describe_file(&path)?
        } else {
            continue;
        };

        debug!("Discovered tool {} at {}", descriptor.name(), descriptor.location().display());
        registry.insert(descriptor)?;
    }

    info!("Discovered {} tools under {}", registry.len(), root.display());
    Ok(registry)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = fs::read_dir(dir).map_err(|e| ToolboxError::Discovery {
        path: dir.to_path_buf(),
        reason: format!("cannot read directory: {}", e),
    })?;
    let mut paths = read
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| ToolboxError::Discovery {
            path: dir.to_path_buf(),
            reason: format!("cannot list directory: {}", e),
        })?;
    paths.sort();
    Ok(paths)
}

/// Resolve the entry file of a tool directory
fn package_entry(dir: &Path, dir_name: &str, options: &DiscoveryOptions) -> Result<Option<PathBuf>> {
    let candidates: Vec<PathBuf> = sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && options.is_entry_file(p))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !options.is_skipped(n))
        })
        .collect();

    let stem_is = |p: &PathBuf, want: &str| p.file_stem().and_then(|s| s.to_str()) == Some(want);
    let named: Vec<&PathBuf> = candidates.iter().filter(|p| stem_is(*p, dir_name)).collect();
    let main: Vec<&PathBuf> = candidates.iter().filter(|p| stem_is(*p, "main")).collect();

    let mut preferred: Vec<&PathBuf> = if dir_name == "main" {
        named
    } else {
        named.into_iter().chain(main).collect()
    };
    preferred.sort();

    match (preferred.len(), candidates.len()) {
        (1, _) => Ok(Some(preferred[0].clone())),
        (0, 0) => Ok(None),
        (0, 1) => Ok(Some(candidates[0].clone())),
        (0, _) => Err(ambiguous(dir, &candidates)),
        _ => Err(ambiguous(dir, &preferred.into_iter().cloned().collect::<Vec<_>>())),
    }
}

fn ambiguous(dir: &Path, candidates: &[PathBuf]) -> ToolboxError {
    ToolboxError::AmbiguousEntry {
        path: dir.to_path_buf(),
        candidates: candidates
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect(),
    }
}

fn describe_file(path: &Path) -> Result<ToolDescriptor> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ToolboxError::Discovery {
            path: path.to_path_buf(),
            reason: "entry file has no usable name".to_string(),
        })?;
    Ok(ToolDescriptor::new(name, path, false).with_description(read_description(path)?))
}

fn describe_package(name: &str, dir: &Path, entry: &Path, options: &DiscoveryOptions) -> Result<ToolDescriptor> {
    let mut descriptor = ToolDescriptor::new(name, entry, true).with_description(read_description(entry)?);

    let manifest = dir.join(&options.manifest_name);
    if manifest.is_file() {
        descriptor = descriptor
            .with_dependencies(load_manifest(&manifest)?)
            .with_manifest(manifest);
    }
    Ok(descriptor)
}

fn read_description(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| ToolboxError::Discovery {
        path: path.to_path_buf(),
        reason: format!("cannot read entry file: {}", e),
    })?;
    Ok(extract_description(&String::from_utf8_lossy(&bytes)))
}
