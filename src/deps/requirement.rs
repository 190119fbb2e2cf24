//! Requirement lines and dependency manifests
//!
//! A manifest is a plain text file with one requirement per line, e.g.
//!
//! ```text
//! # image tooling
//! pillow>=10.0
//! requests[socks]==2.31.0 ; python_version >= "3.8"
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use log::warn;

use crate::error::{Result, ToolboxError};

use super::version::VersionSpec;

/// Normalise a package name so `Foo_Bar`, `foo-bar` and `foo.bar` compare equal
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// One declared dependency: package name plus version constraint
#[derive(Debug, Clone)]
pub struct Requirement {
    /// Name as written in the manifest
    pub name: String,
    /// Normalised lookup key
    pub key: String,
    /// Version constraint; empty means any installed version
    pub spec: VersionSpec,
}

impl Requirement {
    /// Requirement on a package with no version constraint
    pub fn any(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: normalize_name(&name),
            name,
            spec: VersionSpec::any(),
        }
    }

    /// Parse a single requirement line (comments already removed)
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        // environment markers are not evaluated
        let line = line.split(';').next().unwrap_or_default().trim();
        if line.is_empty() {
            return Err("empty requirement".to_string());
        }

        let name_len = line
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        let name = &line[..name_len];
        if name.is_empty() {
            return Err(format!("missing package name in '{}'", line));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !name.ends_with(|c: char| c.is_ascii_alphanumeric())
        {
            return Err(format!("invalid package name '{}'", name));
        }

        let mut rest = line[name_len..].trim_start();
        if let Some(after) = rest.strip_prefix('[') {
            let close = after
                .find(']')
                .ok_or_else(|| format!("unterminated extras in '{}'", line))?;
            rest = after[close + 1..].trim_start();
        }

        // direct references carry no version constraint
        let spec = if rest.starts_with('@') {
            VersionSpec::any()
        } else {
            let rest = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .unwrap_or(rest);
            VersionSpec::parse(rest)?
        };

        Ok(Self {
            name: name.to_string(),
            key: normalize_name(name),
            spec,
        })
    }

    /// Whether an installed version satisfies this requirement
    pub fn accepts(&self, installed_version: &str) -> bool {
        self.spec.matches(installed_version)
    }

    /// Argument handed to the package installer
    pub fn install_arg(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.spec)
    }
}

/// Parse manifest text; `path` is only used for error messages
pub fn parse_manifest(content: &str, path: &Path) -> Result<Vec<Requirement>> {
    let mut requirements: Vec<Requirement> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('-') {
            warn!("Ignoring option line {}:{}: {}", path.display(), index + 1, line);
            continue;
        }

        let requirement = Requirement::parse(line).map_err(|reason| ToolboxError::Manifest {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        })?;

        // repeated packages combine their constraints, keeping first position
        match requirements.iter_mut().find(|r| r.key == requirement.key) {
            Some(existing) => existing.spec.extend(requirement.spec),
            None => requirements.push(requirement),
        }
    }

    Ok(requirements)
}

/// Read and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Vec<Requirement>> {
    let content = fs::read_to_string(path).map_err(|e| ToolboxError::Discovery {
        path: path.to_path_buf(),
        reason: format!("cannot read dependency manifest: {}", e),
    })?;
    parse_manifest(&content, path)
}

fn strip_comment(line: &str) -> &str {
    // `#` only starts a comment at line start or after whitespace
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return &line[..i];
        }
    }
    line
}
