//! Execution Dispatcher
//!
//! `LOOKUP -> DEPENDENCY_CHECK -> EXECUTE -> RELAY_RESULT`. An unknown name
//! fails in LOOKUP; unsatisfied dependencies stop the run before any child
//! process exists. Installation never happens here.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::deps::DependencyResolver;
use crate::error::{Result, ToolboxError};
use crate::tools::{DiscoveryOptions, ToolDescriptor, ToolRegistry, discover};

use super::outcome::ExecutionOutcome;
use super::process::{LaunchSpec, SignalRelay, run_streaming};

/// Locates, verifies and invokes tools by name
#[derive(Clone)]
pub struct Dispatcher {
    tools_root: PathBuf,
    discovery: DiscoveryOptions,
    interpreters: BTreeMap<String, Vec<String>>,
    resolver: DependencyResolver,
}

impl Dispatcher {
    /// Create a dispatcher over `tools_root`
    pub fn new(tools_root: impl Into<PathBuf>, discovery: DiscoveryOptions, resolver: DependencyResolver) -> Self {
        Self {
            tools_root: tools_root.into(),
            discovery,
            interpreters: BTreeMap::new(),
            resolver,
        }
    }

    /// Register the command that runs entries with `extension`
    pub fn with_interpreter(mut self, extension: impl Into<String>, command: &[String]) -> Self {
        self.interpreters.insert(extension.into(), command.to_vec());
        self
    }

    pub fn tools_root(&self) -> &Path {
        &self.tools_root
    }

    /// Discover a fresh registry; nothing is cached between calls
    pub fn registry(&self) -> Result<ToolRegistry> {
        discover(&self.tools_root, &self.discovery)
    }

    /// Full state machine for `run <name> [-- args...]`
    pub async fn run(&self, name: &str, forwarded: &[OsString]) -> Result<ExecutionOutcome> {
        let registry = self.registry()?;
        let descriptor = registry.lookup(name)?;
        self.dispatch(descriptor, forwarded).await
    }

    /// Verify and execute an already resolved tool
    pub async fn dispatch(&self, descriptor: &ToolDescriptor, forwarded: &[OsString]) -> Result<ExecutionOutcome> {
        let report = self.resolver.check(descriptor).await?;
        if !report.is_satisfied() {
            warn!(
                "Blocking {}: {} unsatisfied dependencies",
                descriptor.name(),
                report.unsatisfied().len()
            );
            return Ok(ExecutionOutcome::Blocked { report });
        }

        let spec = self.launch_spec(descriptor, forwarded)?;
        info!("Launching {} with {} forwarded args", descriptor.name(), forwarded.len());

        let exit = run_streaming(&spec, SignalRelay::for_terminal()).await.map_err(|e| ToolboxError::ChildExecution {
            tool: descriptor.name().to_string(),
            reason: format!("failed to start {}: {}", spec.program.to_string_lossy(), e),
        })?;

        if exit.success() {
            info!("{} finished successfully", descriptor.name());
        } else {
            warn!("{} exited with status {}", descriptor.name(), exit.exit_code());
        }
        Ok(ExecutionOutcome::Completed {
            tool: descriptor.name().to_string(),
            exit,
        })
    }

    fn launch_spec(&self, descriptor: &ToolDescriptor, forwarded: &[OsString]) -> Result<LaunchSpec> {
        let extension = descriptor.extension().unwrap_or_default();
        self.interpreters
            .get(extension)
            .and_then(|interpreter| LaunchSpec::new(interpreter, descriptor.location(), forwarded))
            .ok_or_else(|| ToolboxError::ChildExecution {
                tool: descriptor.name().to_string(),
                reason: format!("no interpreter configured for '.{}' files", extension),
            })
    }
}
