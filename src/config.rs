//! Toolbox configuration
//!
//! Loaded from YAML through a fallback chain: the `--config` path, then
//! `<config_dir>/toolbox/toolbox.yml`, then `./toolbox.yml`, then defaults.
//! Every section is optional; a missing field keeps its default.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::deps::{Requirement, load_manifest};
use crate::tools::DiscoveryOptions;

/// Environment variable overriding `tools_root`
pub const TOOLS_ROOT_ENV: &str = "TOOLBOX_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub tools_root: PathBuf,
    pub manifest_name: String,
    pub baseline_manifest: Option<PathBuf>,
    pub baseline: Vec<String>,
    pub ignore: Vec<String>,
    pub interpreters: BTreeMap<String, String>,
    pub packages: PackageManagerConfig,
    pub scaffold: ScaffoldConfig,
    pub check: CheckConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageManagerConfig {
    pub program: String,
    pub list_args: Vec<String>,
    pub install_args: Vec<String>,
    /// Arguments placed before `--version` when probing the program
    pub probe_args: Vec<String>,
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            list_args: ["-m", "pip", "list", "--format=json"].map(String::from).to_vec(),
            install_args: ["-m", "pip", "install"].map(String::from).to_vec(),
            probe_args: ["-m", "pip"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    pub extension: String,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            extension: "py".to_string(),
        }
    }
}

/// Linters run by `check`, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub linters: Vec<LinterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    pub name: String,
    pub command: Vec<String>,
    /// Command used by `check --fix`; empty means the check command is reused
    pub fix_command: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        let python = |args: &[&str]| {
            let mut command = vec!["python3".to_string(), "-m".to_string()];
            command.extend(args.iter().map(|a| a.to_string()));
            command
        };
        Self {
            linters: vec![
                LinterConfig {
                    name: "black".to_string(),
                    command: python(&["black", "--check", "."]),
                    fix_command: python(&["black", "."]),
                },
                LinterConfig {
                    name: "ruff".to_string(),
                    command: python(&["ruff", "check", "."]),
                    fix_command: python(&["ruff", "check", "--fix", "."]),
                },
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            tools_root: PathBuf::from("scripts"),
            manifest_name: "requirements.txt".to_string(),
            baseline_manifest: None,
            baseline: Vec::new(),
            ignore: ["__pycache__", "*.egg-info", "venv", "node_modules"]
                .map(String::from)
                .to_vec(),
            interpreters: BTreeMap::from([("py".to_string(), "python3".to_string())]),
            packages: PackageManagerConfig::default(),
            scaffold: ScaffoldConfig::default(),
            check: CheckConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply the tools root override: explicit flag, then environment
    pub fn with_tools_root(mut self, flag: Option<PathBuf>) -> Self {
        if let Some(root) = flag {
            self.tools_root = root;
        } else if let Some(root) = std::env::var_os(TOOLS_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.tools_root = PathBuf::from(root);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.interpreters.is_empty() {
            eyre::bail!("interpreters must map at least one extension");
        }
        if let Some(ext) = self.interpreters.keys().find(|e| e.is_empty() || e.starts_with('.')) {
            eyre::bail!("interpreter extension '{}' must be given without a leading dot", ext);
        }
        if let Some((ext, _)) = self.interpreters.iter().find(|(_, cmd)| cmd.trim().is_empty()) {
            eyre::bail!("interpreter for '{}' is empty", ext);
        }
        if !self.interpreters.contains_key(&self.scaffold.extension) {
            eyre::bail!("scaffold.extension '{}' has no interpreter", self.scaffold.extension);
        }
        if self.manifest_name.is_empty() || self.manifest_name.contains(['/', '\\']) {
            eyre::bail!("manifest_name must be a plain file name");
        }
        if self.packages.program.trim().is_empty() {
            eyre::bail!("packages.program must not be empty");
        }
        for linter in &self.check.linters {
            if linter.name.trim().is_empty() {
                eyre::bail!("check.linters entries need a name");
            }
            if linter.command.is_empty() {
                eyre::bail!("linter '{}' has no command", linter.name);
            }
        }
        Ok(())
    }

    /// Discovery settings derived from this configuration
    pub fn discovery_options(&self) -> crate::error::Result<DiscoveryOptions> {
        DiscoveryOptions {
            extensions: self.interpreters.keys().cloned().collect(),
            manifest_name: self.manifest_name.clone(),
            ignore: Vec::new(),
        }
        .with_ignore_patterns(&self.ignore)
    }

    /// Baseline requirements from the inline list and the baseline manifest
    pub fn baseline_requirements(&self) -> crate::error::Result<Vec<Requirement>> {
        let mut requirements = match &self.baseline_manifest {
            Some(path) => load_manifest(path)?,
            None => Vec::new(),
        };
        let inline = self.baseline.join("\n");
        for requirement in crate::deps::parse_manifest(&inline, Path::new("<config baseline>"))? {
            if !requirements.iter().any(|r| r.key == requirement.key) {
                requirements.push(requirement);
            }
        }
        Ok(requirements)
    }

    /// Interpreter command line for an extension, split on whitespace
    pub fn interpreter_for(&self, extension: &str) -> Option<Vec<String>> {
        self.interpreters
            .get(extension)
            .map(|cmd| cmd.split_whitespace().map(String::from).collect())
    }
}
