//! Package environment capability
//!
//! The resolver never caches what is installed; it asks a
//! [`PackageEnvironment`] every time. [`CommandEnvironment`] backs this with
//! the configured package manager, tests use an in-memory implementation.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::PackageManagerConfig;
use crate::error::{Result, ToolboxError};

use super::requirement::{Requirement, normalize_name};

/// Marker the installer prints when the interpreter is system managed
pub const EXTERNALLY_MANAGED_MARKER: &str = "externally-managed-environment";

/// Snapshot of installed packages keyed by normalised name
#[derive(Debug, Clone, Default)]
pub struct InstalledPackages {
    versions: HashMap<String, String>,
}

impl InstalledPackages {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an installed package
    pub fn insert(&mut self, name: &str, version: impl Into<String>) {
        self.versions.insert(normalize_name(name), version.into());
    }

    /// Installed version of a package, if any
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.versions.get(&normalize_name(name)).map(|v| v.as_str())
    }

    /// Number of packages in the snapshot
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl FromIterator<(String, String)> for InstalledPackages {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut packages = Self::new();
        for (name, version) in iter {
            packages.insert(&name, version);
        }
        packages
    }
}

/// Result of asking the installer for one requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAttempt {
    Installed,
    Failed { reason: String },
    /// The environment refuses direct installation
    ExternallyManaged { reason: String },
}

/// Inspect and mutate the package set available to tools
#[async_trait]
pub trait PackageEnvironment: Send + Sync {
    /// Query the currently installed packages; must not mutate anything
    async fn installed(&self) -> Result<InstalledPackages>;

    /// Install one requirement
    async fn install(&self, requirement: &Requirement) -> Result<InstallAttempt>;
}

#[derive(Debug, Deserialize)]
struct ListedPackage {
    name: String,
    version: String,
}

/// Parse the JSON array printed by `pip list --format=json`
pub fn parse_package_list(json: &str) -> Result<InstalledPackages> {
    let listed: Vec<ListedPackage> = serde_json::from_str(json)?;
    Ok(listed.into_iter().map(|p| (p.name, p.version)).collect())
}

/// Environment driven by an external package manager program
#[derive(Debug, Clone)]
pub struct CommandEnvironment {
    config: PackageManagerConfig,
}

impl CommandEnvironment {
    /// Create an environment from the package manager settings
    pub fn new(config: PackageManagerConfig) -> Self {
        Self { config }
    }

    /// Program invoked for listing and installing
    pub fn program(&self) -> &str {
        &self.config.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(args);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl PackageEnvironment for CommandEnvironment {
    async fn installed(&self) -> Result<InstalledPackages> {
        debug!("Listing packages via {} {:?}", self.config.program, self.config.list_args);
        let output = self
            .command(&self.config.list_args)
            .output()
            .await
            .map_err(|e| ToolboxError::Environment(format!("failed to run {}: {}", self.config.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolboxError::Environment(format!(
                "{} exited with {:?}: {}",
                self.config.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_package_list(&stdout)
    }

    async fn install(&self, requirement: &Requirement) -> Result<InstallAttempt> {
        let mut args = self.config.install_args.clone();
        args.push(requirement.install_arg());
        info!("Installing {} via {} {:?}", requirement, self.config.program, args);

        let output = match self.command(&args).output().await {
            Ok(output) => output,
            Err(e) => {
                return Ok(InstallAttempt::Failed {
                    reason: format!("failed to run {}: {}", self.config.program, e),
                });
            }
        };

        if output.status.success() {
            return Ok(InstallAttempt::Installed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains(EXTERNALLY_MANAGED_MARKER) {
            Ok(InstallAttempt::ExternallyManaged { reason: stderr })
        } else {
            Ok(InstallAttempt::Failed {
                reason: format!("exit code {:?}: {}", output.status.code(), stderr),
            })
        }
    }
}
