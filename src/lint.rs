//! Code quality checks over the tools root
//!
//! Each configured linter runs once with the tools root as its working
//! directory and its output streamed to the terminal. A failing linter does
//! not stop the ones after it.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::LinterConfig;

/// Result of one linter invocation
#[derive(Debug, Clone)]
pub struct LintResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl fmt::Display for LintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.detail)
    }
}

/// All linter results for one `check` invocation
#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub fix: bool,
    pub results: Vec<LintResult>,
}

impl LintReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failed(&self) -> Vec<&LintResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Command line a linter uses in check or fix mode
///
/// A linter without a fix command runs its check command in both modes.
pub fn command_for(linter: &LinterConfig, fix: bool) -> &[String] {
    if fix && !linter.fix_command.is_empty() {
        &linter.fix_command
    } else {
        &linter.command
    }
}

/// Run one linter inside `root`
pub async fn run_linter(linter: &LinterConfig, root: &Path, fix: bool) -> LintResult {
    let command = command_for(linter, fix);
    let Some((program, args)) = command.split_first() else {
        return LintResult {
            name: linter.name.clone(),
            passed: false,
            detail: "no command configured".to_string(),
        };
    };

    debug!("Running {} via {} {:?} in {}", linter.name, program, args, root.display());
    let status = Command::new(program)
        .args(args)
        .current_dir(root)
        .stdin(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => LintResult {
            name: linter.name.clone(),
            passed: true,
            detail: if fix { "fixed".to_string() } else { "ok".to_string() },
        },
        Ok(status) => {
            warn!("{} reported issues ({:?})", linter.name, status.code());
            LintResult {
                name: linter.name.clone(),
                passed: false,
                detail: match status.code() {
                    Some(code) => format!("issues found (exit code {})", code),
                    None => "terminated by a signal".to_string(),
                },
            }
        }
        Err(e) => LintResult {
            name: linter.name.clone(),
            passed: false,
            detail: format!("cannot run {}: {}", program, e),
        },
    }
}

/// Run every linter in order over the tools root
pub async fn run_linters(linters: &[LinterConfig], root: &Path, fix: bool) -> LintReport {
    info!("Running {} linter(s) over {} (fix: {})", linters.len(), root.display(), fix);
    let mut report = LintReport {
        fix,
        results: Vec::with_capacity(linters.len()),
    };
    for linter in linters {
        report.results.push(run_linter(linter, root, fix).await);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn linter(name: &str, command: &str, fix_command: Option<&str>) -> LinterConfig {
        let sh = |script: &str| vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        LinterConfig {
            name: name.to_string(),
            command: sh(command),
            fix_command: fix_command.map(sh).unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_linter_runs_in_tools_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("clean.marker"), "").unwrap();

        let result = run_linter(&linter("marker", "test -f clean.marker", None), dir.path(), false).await;
        assert!(result.passed, "{}", result);
        assert_eq!(result.detail, "ok");
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_linters() {
        let dir = TempDir::new().unwrap();
        let linters = vec![
            linter("format", "exit 3", None),
            linter("lint", "touch ran.marker", None),
        ];

        let report = run_linters(&linters, dir.path(), false).await;
        assert!(!report.passed());
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].name, "format");
        assert!(report.failed()[0].detail.contains("exit code 3"));
        assert!(dir.path().join("ran.marker").exists());
    }

    #[tokio::test]
    async fn test_fix_mode_uses_fix_command() {
        let dir = TempDir::new().unwrap();
        let format = linter("format", "test -f formatted.marker", Some("touch formatted.marker"));

        assert!(!run_linter(&format, dir.path(), false).await.passed);
        let fixed = run_linter(&format, dir.path(), true).await;
        assert!(fixed.passed);
        assert_eq!(fixed.detail, "fixed");
        assert!(run_linter(&format, dir.path(), false).await.passed);
    }

    #[test]
    fn test_fix_falls_back_to_check_command() {
        let only_check = linter("lint", "true", None);
        assert_eq!(command_for(&only_check, true), only_check.command.as_slice());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let ghost = LinterConfig {
            name: "ghost".to_string(),
            command: vec!["toolbox-definitely-missing-linter".to_string()],
            fix_command: Vec::new(),
        };
        let result = run_linter(&ghost, dir.path(), false).await;
        assert!(!result.passed);
        assert!(result.detail.contains("cannot run"));
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let dir = TempDir::new().unwrap();
        let empty = LinterConfig {
            name: "empty".to_string(),
            command: Vec::new(),
            fix_command: Vec::new(),
        };
        assert!(!run_linter(&empty, dir.path(), false).await.passed);
    }

    #[tokio::test]
    async fn test_no_linters_passes() {
        let dir = TempDir::new().unwrap();
        let report = run_linters(&[], dir.path(), true).await;
        assert!(report.passed());
        assert!(report.fix);
    }
}
