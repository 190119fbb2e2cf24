//! In-memory package environment
//!
//! Behaves like a package manager without touching the system: installs
//! succeed unless the package was marked as failing, and every install is
//! recorded so callers can assert on mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;

use super::environment::{InstallAttempt, InstalledPackages, PackageEnvironment};
use super::requirement::{Requirement, normalize_name};
use super::version::Operator;

#[derive(Debug, Default)]
struct State {
    installed: HashMap<String, String>,
    available: HashMap<String, String>,
    failing: HashSet<String>,
    externally_managed: bool,
    refused: HashSet<String>,
    install_log: Vec<String>,
}

/// Package environment held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    state: Mutex<State>,
}

impl MemoryEnvironment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a package as already installed
    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.lock().installed.insert(normalize_name(name), version.to_string());
        self
    }

    /// Version the installer will put in place for `name` (default `1.0.0`)
    pub fn with_available(self, name: &str, version: &str) -> Self {
        self.lock().available.insert(normalize_name(name), version.to_string());
        self
    }

    /// Make installs of `name` fail
    pub fn with_failing(self, name: &str) -> Self {
        self.lock().failing.insert(normalize_name(name));
        self
    }

    /// Refuse every install as a system-managed interpreter would
    pub fn externally_managed(self) -> Self {
        self.lock().externally_managed = true;
        self
    }

    /// Refuse installs of `name` only, after earlier packages went through
    pub fn with_refused(self, name: &str) -> Self {
        self.lock().refused.insert(normalize_name(name));
        self
    }

    /// Requirements passed to `install`, in call order
    pub fn install_log(&self) -> Vec<String> {
        self.lock().install_log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PackageEnvironment for MemoryEnvironment {
    async fn installed(&self) -> Result<InstalledPackages> {
        let state = self.lock();
        Ok(state
            .installed
            .iter()
            .map(|(name, version)| (name.clone(), version.clone()))
            .collect())
    }

    async fn install(&self, requirement: &Requirement) -> Result<InstallAttempt> {
        let mut state = self.lock();
        state.install_log.push(requirement.to_string());

        if state.externally_managed || state.refused.contains(&requirement.key) {
            return Ok(InstallAttempt::ExternallyManaged {
                reason: "error: externally-managed-environment".to_string(),
            });
        }
        if state.failing.contains(&requirement.key) {
            return Ok(InstallAttempt::Failed {
                reason: format!("no matching distribution for {}", requirement),
            });
        }

        // an exact pin installs the pinned version
        let version = requirement
            .spec
            .clauses()
            .iter()
            .find(|c| c.operator == Operator::Exact && !c.wildcard)
            .map(|c| c.version.to_string())
            .or_else(|| state.available.get(&requirement.key).cloned())
            .unwrap_or_else(|| "1.0.0".to_string());
        state.installed.insert(requirement.key.clone(), version);
        Ok(InstallAttempt::Installed)
    }
}
