//! Error types for Toolbox
//!
//! Centralized error handling using thiserror. Every variant names the tool
//! or path it concerns so the CLI can report it without extra context.

use std::path::PathBuf;

use thiserror::Error;

use crate::deps::DependencyCheck;

/// Exit status for a `run`/`install`/`deps` against a name not in the registry
pub const EXIT_UNKNOWN_TOOL: i32 = 127;

/// Exit status when dependency verification blocks a run
pub const EXIT_DEPENDENCY_UNSATISFIED: i32 = 126;

/// Exit status for every other orchestrator-level failure
pub const EXIT_FAILURE: i32 = 1;

/// All error types that can occur in Toolbox
#[derive(Debug, Error)]
pub enum ToolboxError {
    /// Malformed tool layout or unreadable tools root
    #[error("Discovery failed at {}: {reason}", path.display())]
    Discovery { path: PathBuf, reason: String },

    /// Two candidates derive the same tool name
    #[error("Duplicate tool '{name}': {} and {}", first.display(), second.display())]
    DuplicateTool {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A tool directory has more than one plausible entry file
    #[error("Ambiguous entry in {}: {}", path.display(), candidates.join(", "))]
    AmbiguousEntry { path: PathBuf, candidates: Vec<String> },

    /// A dependency manifest line could not be parsed
    #[error("Invalid manifest {}:{line}: {reason}", path.display())]
    Manifest {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Name not present in the freshly discovered registry
    #[error("Unknown tool '{name}'")]
    UnknownTool { name: String, available: Vec<String> },

    /// Dependency verification blocked the run
    #[error("Tool '{tool}' has unsatisfied dependencies: {}", describe_checks(unsatisfied))]
    DependencyUnsatisfied {
        tool: String,
        unsatisfied: Vec<DependencyCheck>,
        hint: String,
    },

    /// Some or all packages failed to install
    #[error("Installing dependencies for '{tool}' failed: {}", failed.join(", "))]
    InstallFailure {
        tool: String,
        failed: Vec<String>,
        succeeded: Vec<String>,
    },

    /// The package manager refuses to touch a system-managed environment
    #[error("Cannot install dependencies for '{tool}' into an externally managed environment")]
    ExternallyManaged {
        tool: String,
        hint: String,
        installed: Vec<String>,
    },

    /// The tool's child process could not be started or awaited
    #[error("Tool '{tool}' could not be executed: {reason}")]
    ChildExecution { tool: String, reason: String },

    /// Scaffold name fails identifier rules
    #[error("Invalid tool name '{name}': {reason}")]
    InvalidToolName { name: String, reason: String },

    /// Scaffold target already exists
    #[error("Tool '{name}' already exists at {}", path.display())]
    ToolExists { name: String, path: PathBuf },

    /// Environment inspection failed
    #[error("Environment error: {0}")]
    Environment(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolboxError {
    /// Process exit status the CLI should use for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownTool { .. } => EXIT_UNKNOWN_TOOL,
            Self::DependencyUnsatisfied { .. } => EXIT_DEPENDENCY_UNSATISFIED,
            _ => EXIT_FAILURE,
        }
    }

    /// Actionable follow-up for the user, when one exists
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::DependencyUnsatisfied { hint, .. } => Some(hint.clone()),
            Self::ExternallyManaged { hint, installed, .. } if !installed.is_empty() => Some(format!(
                "{}\nInstalled before the refusal: {}",
                hint,
                installed.join(", ")
            )),
            Self::ExternallyManaged { hint, .. } => Some(hint.clone()),
            Self::UnknownTool { available, .. } if available.is_empty() => {
                Some("No tools are installed; create one with `toolbox new <name>`".to_string())
            }
            Self::UnknownTool { available, .. } => {
                Some(format!("Available tools: {}", available.join(", ")))
            }
            Self::InstallFailure { succeeded, .. } if !succeeded.is_empty() => {
                Some(format!("Installed before the failure: {}", succeeded.join(", ")))
            }
            _ => None,
        }
    }
}

fn describe_checks(checks: &[DependencyCheck]) -> String {
    checks
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for Toolbox operations
pub type Result<T> = std::result::Result<T, ToolboxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::{CheckStatus, Requirement};

    #[test]
    fn test_unknown_tool_error() {
        let err = ToolboxError::UnknownTool {
            name: "nope".to_string(),
            available: vec!["alpha".to_string()],
        };
        assert_eq!(err.to_string(), "Unknown tool 'nope'");
        assert_eq!(err.exit_code(), EXIT_UNKNOWN_TOOL);
        assert_eq!(err.hint().as_deref(), Some("Available tools: alpha"));
    }

    #[test]
    fn test_unknown_tool_empty_registry_hint() {
        let err = ToolboxError::UnknownTool {
            name: "nope".to_string(),
            available: vec![],
        };
        assert!(err.hint().unwrap().contains("toolbox new"));
    }

    #[test]
    fn test_dependency_unsatisfied_error() {
        let check = DependencyCheck {
            requirement: Requirement::parse("requests==2.31.0").unwrap(),
            status: CheckStatus::Missing,
        };
        let err = ToolboxError::DependencyUnsatisfied {
            tool: "beta".to_string(),
            unsatisfied: vec![check],
            hint: "toolbox install beta".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Tool 'beta' has unsatisfied dependencies: requests==2.31.0 (missing)"
        );
        assert_eq!(err.exit_code(), EXIT_DEPENDENCY_UNSATISFIED);
        assert_eq!(err.hint().as_deref(), Some("toolbox install beta"));
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_ne!(EXIT_UNKNOWN_TOOL, EXIT_DEPENDENCY_UNSATISFIED);
        assert_ne!(EXIT_UNKNOWN_TOOL, EXIT_FAILURE);
        assert_ne!(EXIT_DEPENDENCY_UNSATISFIED, EXIT_FAILURE);
    }

    #[test]
    fn test_duplicate_tool_error() {
        let err = ToolboxError::DuplicateTool {
            name: "cleaner".to_string(),
            first: PathBuf::from("scripts/cleaner.py"),
            second: PathBuf::from("scripts/cleaner/cleaner.py"),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate tool 'cleaner': scripts/cleaner.py and scripts/cleaner/cleaner.py"
        );
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_install_failure_hint_lists_succeeded() {
        let err = ToolboxError::InstallFailure {
            tool: "beta".to_string(),
            failed: vec!["pillow".to_string()],
            succeeded: vec!["requests".to_string()],
        };
        assert_eq!(err.to_string(), "Installing dependencies for 'beta' failed: pillow");
        assert_eq!(err.hint().as_deref(), Some("Installed before the failure: requests"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ToolboxError = io_err.into();
        assert!(matches!(err, ToolboxError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ToolboxError = json_err.into();
        assert!(matches!(err, ToolboxError::Json(_)));
    }
}
