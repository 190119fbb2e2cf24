//! Dependency Resolver - check and install a tool's declared requirements
//!
//! `check` is read-only. `install` is the single operation that mutates the
//! environment and only ever touches requirements `check` found unsatisfied.

use std::fmt;
use std::sync::Arc;

use log::{info, warn};

use crate::error::{Result, ToolboxError};
use crate::tools::ToolDescriptor;

use super::environment::{InstallAttempt, InstalledPackages, PackageEnvironment};
use super::requirement::Requirement;

/// Verdict for one requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Satisfied { installed: String },
    Missing,
    VersionMismatch { installed: String },
}

impl CheckStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }
}

/// A requirement together with its verdict
#[derive(Debug, Clone)]
pub struct DependencyCheck {
    pub requirement: Requirement,
    pub status: CheckStatus,
}

impl DependencyCheck {
    /// Evaluate a requirement against an installed package snapshot
    pub fn evaluate(requirement: &Requirement, installed: &InstalledPackages) -> Self {
        let status = match installed.version_of(&requirement.key) {
            None => CheckStatus::Missing,
            Some(version) if requirement.accepts(version) => CheckStatus::Satisfied {
                installed: version.to_string(),
            },
            Some(version) => CheckStatus::VersionMismatch {
                installed: version.to_string(),
            },
        };
        Self {
            requirement: requirement.clone(),
            status,
        }
    }
}

impl fmt::Display for DependencyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            CheckStatus::Satisfied { installed } => write!(f, "{} (installed {})", self.requirement, installed),
            CheckStatus::Missing => write!(f, "{} (missing)", self.requirement),
            CheckStatus::VersionMismatch { installed } => {
                write!(f, "{} (found {})", self.requirement, installed)
            }
        }
    }
}

/// Aggregated check results for one tool
#[derive(Debug, Clone)]
pub struct DependencyReport {
    pub tool: String,
    pub checks: Vec<DependencyCheck>,
}

impl DependencyReport {
    /// Overall verdict: every requirement satisfied
    pub fn is_satisfied(&self) -> bool {
        self.checks.iter().all(|c| c.status.is_satisfied())
    }

    /// Requirements that are missing or mismatched
    pub fn unsatisfied(&self) -> Vec<&DependencyCheck> {
        self.checks.iter().filter(|c| !c.status.is_satisfied()).collect()
    }

    /// Convert an unsatisfied report into the blocking error
    pub fn into_error(self) -> ToolboxError {
        let hint = install_hint(&self.tool);
        let unsatisfied = self
            .checks
            .into_iter()
            .filter(|c| !c.status.is_satisfied())
            .collect();
        ToolboxError::DependencyUnsatisfied {
            tool: self.tool,
            unsatisfied,
            hint,
        }
    }
}

/// What `install` did for one tool
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub tool: String,
    pub already_satisfied: Vec<String>,
    pub installed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    /// Whether every requirement ended satisfied
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ok when nothing failed, otherwise the aggregate failure
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ToolboxError::InstallFailure {
            tool: self.tool,
            failed: self.failed.into_iter().map(|(name, _)| name).collect(),
            succeeded: self.installed,
        })
    }
}

/// Remediation shown when a run is blocked
pub fn install_hint(tool: &str) -> String {
    format!("Install them with: {} install {}", env!("CARGO_PKG_NAME"), tool)
}

fn externally_managed_hint(tool: &str) -> String {
    format!(
        "Use an isolated environment instead:\n   python3 -m venv .venv\n   source .venv/bin/activate\n   {} install {}",
        env!("CARGO_PKG_NAME"),
        tool
    )
}

/// Checks and installs tool requirements against a package environment
#[derive(Clone)]
pub struct DependencyResolver {
    environment: Arc<dyn PackageEnvironment>,
    baseline: Vec<Requirement>,
}

impl DependencyResolver {
    /// Create a resolver with no baseline requirements
    pub fn new(environment: Arc<dyn PackageEnvironment>) -> Self {
        Self {
            environment,
            baseline: Vec::new(),
        }
    }

    /// Set the baseline requirements shared by every tool
    pub fn with_baseline(mut self, baseline: Vec<Requirement>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Baseline requirements
    pub fn baseline(&self) -> &[Requirement] {
        &self.baseline
    }

    /// Effective requirements: baseline first, tool-local entries replace
    /// baseline entries for the same package
    pub fn requirements_for(&self, descriptor: &ToolDescriptor) -> Vec<Requirement> {
        let local = descriptor.dependencies();
        let mut merged: Vec<Requirement> = self
            .baseline
            .iter()
            .filter(|b| !local.iter().any(|l| l.key == b.key))
            .cloned()
            .collect();
        merged.extend(local.iter().cloned());
        merged
    }

    /// Determine satisfied/missing/mismatched for every requirement
    pub async fn check(&self, descriptor: &ToolDescriptor) -> Result<DependencyReport> {
        let requirements = self.requirements_for(descriptor);
        if requirements.is_empty() {
            return Ok(DependencyReport {
                tool: descriptor.name().to_string(),
                checks: Vec::new(),
            });
        }

        let installed = self.environment.installed().await?;
        let checks = requirements
            .iter()
            .map(|r| DependencyCheck::evaluate(r, &installed))
            .collect();
        Ok(DependencyReport {
            tool: descriptor.name().to_string(),
            checks,
        })
    }

    /// Install exactly the unsatisfied requirements of one tool
    ///
    /// Individual failures do not stop the remaining installs and nothing is
    /// rolled back. An externally managed environment aborts immediately.
    pub async fn install(&self, descriptor: &ToolDescriptor) -> Result<InstallReport> {
        let report = self.check(descriptor).await?;
        let mut result = InstallReport {
            tool: descriptor.name().to_string(),
            ..Default::default()
        };

        for check in &report.checks {
            if check.status.is_satisfied() {
                result.already_satisfied.push(check.requirement.to_string());
                continue;
            }

            let requirement = &check.requirement;
            match self.environment.install(requirement).await? {
                InstallAttempt::Installed => {
                    info!("Installed {} for {}", requirement, descriptor.name());
                    result.installed.push(requirement.to_string());
                }
                InstallAttempt::Failed { reason } => {
                    warn!("Failed to install {} for {}: {}", requirement, descriptor.name(), reason);
                    result.failed.push((requirement.to_string(), reason));
                }
                InstallAttempt::ExternallyManaged { reason } => {
                    warn!("Environment is externally managed: {}", reason);
                    return Err(ToolboxError::ExternallyManaged {
                        tool: descriptor.name().to_string(),
                        hint: externally_managed_hint(descriptor.name()),
                        installed: result.installed,
                    });
                }
            }
        }

        if !result.installed.is_empty() {
            // the installer may report success without meeting the constraint
            let after = self.check(descriptor).await?;
            for check in after.unsatisfied() {
                let name = check.requirement.to_string();
                if let Some(pos) = result.installed.iter().position(|n| *n == name) {
                    result.installed.remove(pos);
                    result.failed.push((name, format!("still unsatisfied after install: {}", check)));
                }
            }
        }

        Ok(result)
    }
}
