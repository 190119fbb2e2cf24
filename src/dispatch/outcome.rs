//! Execution outcomes

use std::process::ExitStatus;

use crate::deps::DependencyReport;
use crate::error::{EXIT_DEPENDENCY_UNSATISFIED, EXIT_FAILURE, ToolboxError};

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    /// Exit code, when the child exited normally
    pub code: Option<i32>,
    /// Terminating signal, when the child was killed
    pub signal: Option<i32>,
}

impl ChildExit {
    /// Child exited normally with `code`
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Status to relay as our own; shells report signal deaths as 128+N
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => EXIT_FAILURE,
        }
    }
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Result of dispatching one tool
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Dependency verification stopped the run; the tool never started
    Blocked { report: DependencyReport },
    /// The tool ran to completion (successfully or not)
    Completed { tool: String, exit: ChildExit },
}

impl ExecutionOutcome {
    pub fn tool(&self) -> &str {
        match self {
            Self::Blocked { report } => &report.tool,
            Self::Completed { tool, .. } => tool,
        }
    }

    /// Whether dependency verification blocked the run
    pub fn was_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Whether the tool ran and exited zero
    pub fn success(&self) -> bool {
        matches!(self, Self::Completed { exit, .. } if exit.success())
    }

    /// Exit status the orchestrator should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Blocked { .. } => EXIT_DEPENDENCY_UNSATISFIED,
            Self::Completed { exit, .. } => exit.exit_code(),
        }
    }

    /// Blocking error for a blocked run
    pub fn blocking_error(self) -> Option<ToolboxError> {
        match self {
            Self::Blocked { report } => Some(report.into_error()),
            Self::Completed { .. } => None,
        }
    }
}
