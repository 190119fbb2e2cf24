//! Toolbox orchestrator - wires configuration, discovery, resolver,
//! dispatcher and scaffolder together for one invocation
//!
//! Every operation rediscovers the tools root; nothing survives between
//! calls except the read-only configuration.

use std::ffi::OsString;
use std::sync::Arc;

use log::info;

use crate::config::Config;
use crate::deps::{CommandEnvironment, DependencyReport, DependencyResolver, InstallReport, PackageEnvironment};
use crate::dispatch::{Dispatcher, ExecutionOutcome};
use crate::doctor::{DoctorReport, run_checks};
use crate::error::{Result, ToolboxError};
use crate::lint::{LintReport, run_linters};
use crate::scaffold::{ScaffoldResult, Scaffolder};
use crate::tools::ToolRegistry;

/// Entry point for every command
pub struct Toolbox {
    config: Config,
    resolver: DependencyResolver,
    dispatcher: Dispatcher,
}

impl Toolbox {
    /// Build a toolbox backed by the configured package manager
    pub fn from_config(config: Config) -> Result<Self> {
        let environment = Arc::new(CommandEnvironment::new(config.packages.clone()));
        Self::new(config, environment)
    }

    /// Build a toolbox over an explicit package environment
    pub fn new(config: Config, environment: Arc<dyn PackageEnvironment>) -> Result<Self> {
        let discovery = config.discovery_options()?;
        let resolver = DependencyResolver::new(environment).with_baseline(config.baseline_requirements()?);

        let mut dispatcher = Dispatcher::new(config.tools_root.clone(), discovery, resolver.clone());
        for extension in config.interpreters.keys() {
            if let Some(command) = config.interpreter_for(extension) {
                dispatcher = dispatcher.with_interpreter(extension.clone(), &command);
            }
        }

        Ok(Self {
            config,
            resolver,
            dispatcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fresh registry of every tool under the tools root
    pub fn discover(&self) -> Result<ToolRegistry> {
        self.dispatcher.registry()
    }

    /// `run <name> [-- args...]`
    pub async fn run(&self, name: &str, forwarded: &[OsString]) -> Result<ExecutionOutcome> {
        info!("Running {} from {}", name, self.config.tools_root.display());
        self.dispatcher.run(name, forwarded).await
    }

    /// Read-only dependency report for one tool
    pub async fn check(&self, name: &str) -> Result<DependencyReport> {
        let registry = self.discover()?;
        self.resolver.check(registry.lookup(name)?).await
    }

    /// `install <name>`
    pub async fn install(&self, name: &str) -> Result<InstallReport> {
        let registry = self.discover()?;
        let descriptor = registry.lookup(name)?;
        info!("Installing dependencies for {}", name);
        self.resolver.install(descriptor).await
    }

    /// `new <name>`
    pub fn create(&self, name: &str) -> Result<ScaffoldResult> {
        let extension = &self.config.scaffold.extension;
        let interpreter = self.config.interpreters.get(extension).ok_or_else(|| {
            ToolboxError::Template(format!("no interpreter configured for '.{}' files", extension))
        })?;
        let scaffolder = Scaffolder::new(
            self.config.tools_root.clone(),
            extension.clone(),
            interpreter.clone(),
            self.config.manifest_name.clone(),
        )?;

        let registry = self.discover()?;
        scaffolder.create(name, &registry)
    }

    /// `check [--fix]` over the tools root
    pub async fn lint(&self, fix: bool) -> Result<LintReport> {
        let root = &self.config.tools_root;
        if !root.is_dir() {
            return Err(ToolboxError::Discovery {
                path: root.clone(),
                reason: "tools root does not exist".to_string(),
            });
        }
        Ok(run_linters(&self.config.check.linters, root, fix).await)
    }

    /// Readiness checks for the host and configured programs
    pub async fn doctor(&self) -> DoctorReport {
        run_checks(&self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::MemoryEnvironment;
    use std::fs;
    use tempfile::TempDir;

    fn toolbox(root: &std::path::Path, env: MemoryEnvironment) -> Toolbox {
        let mut config = Config::default().with_tools_root(Some(root.to_path_buf()));
        config.interpreters.insert("sh".to_string(), "sh".to_string());
        config.scaffold.extension = "sh".to_string();
        Toolbox::new(config, Arc::new(env)).unwrap()
    }

    #[tokio::test]
    async fn test_check_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let err = toolbox(dir.path(), MemoryEnvironment::new()).check("nope").await.unwrap_err();
        assert!(matches!(err, ToolboxError::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn test_install_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let err = toolbox(dir.path(), MemoryEnvironment::new())
            .install("nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolboxError::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn test_create_then_run() {
        let dir = TempDir::new().unwrap();
        let toolbox = toolbox(dir.path(), MemoryEnvironment::new());

        let created = toolbox.create("hello").unwrap();
        assert!(created.entry.ends_with("hello/hello.sh"));
        assert!(toolbox.discover().unwrap().contains("hello"));

        let outcome = toolbox.run("hello", &[OsString::from("x")]).await.unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_baseline_blocks_every_tool() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("alpha.sh"), "exit 0\n").unwrap();

        let mut config = Config::default().with_tools_root(Some(dir.path().to_path_buf()));
        config.interpreters.insert("sh".to_string(), "sh".to_string());
        config.baseline = vec!["colorama".to_string()];
        let toolbox = Toolbox::new(config, Arc::new(MemoryEnvironment::new())).unwrap();

        let outcome = toolbox.run("alpha", &[]).await.unwrap();
        assert!(outcome.was_blocked());
    }

    #[tokio::test]
    async fn test_lint_runs_configured_linters() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default().with_tools_root(Some(dir.path().to_path_buf()));
        config.check.linters = vec![crate::config::LinterConfig {
            name: "touch".to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "touch linted".to_string()],
            fix_command: Vec::new(),
        }];
        let toolbox = Toolbox::new(config, Arc::new(MemoryEnvironment::new())).unwrap();

        let report = toolbox.lint(false).await.unwrap();
        assert!(report.passed());
        assert!(dir.path().join("linted").exists());
    }

    #[tokio::test]
    async fn test_lint_missing_root() {
        let dir = TempDir::new().unwrap();
        let toolbox = toolbox(&dir.path().join("absent"), MemoryEnvironment::new());
        let err = toolbox.lint(true).await.unwrap_err();
        assert!(matches!(err, ToolboxError::Discovery { .. }));
    }

    #[test]
    fn test_invalid_ignore_pattern_fails_construction() {
        let mut config = Config::default();
        config.ignore = vec!["[".to_string()];
        assert!(Toolbox::new(config, Arc::new(MemoryEnvironment::new())).is_err());
    }
}
