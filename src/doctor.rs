//! Environment readiness checks
//!
//! Confirms the host OS is supported and that every configured interpreter
//! and the package manager program can be launched.

use std::fmt;
use std::process::Stdio;

use log::debug;
use tokio::process::Command;

use crate::config::Config;

/// Operating systems the toolbox is exercised on
pub const SUPPORTED_OS: [&str; 2] = ["linux", "macos"];

/// One readiness check
#[derive(Debug, Clone)]
pub struct DoctorCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl fmt::Display for DoctorCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.detail)
    }
}

/// All readiness checks
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

/// Check the OS name against [`SUPPORTED_OS`]
pub fn check_os(os: &str) -> DoctorCheck {
    let passed = SUPPORTED_OS.contains(&os);
    DoctorCheck {
        name: "os".to_string(),
        passed,
        detail: if passed {
            os.to_string()
        } else {
            format!("{} is not supported (supported: {})", os, SUPPORTED_OS.join(", "))
        },
    }
}

/// Run `<command...> --version` and report its first output line
pub async fn check_command(name: &str, command: &[String]) -> DoctorCheck {
    let Some((program, args)) = command.split_first() else {
        return DoctorCheck {
            name: name.to_string(),
            passed: false,
            detail: "no command configured".to_string(),
        };
    };

    debug!("Probing {} via {} {:?} --version", name, program, args);
    let output = Command::new(program)
        .args(args)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            // some interpreters print their version on stderr
            let text = if output.stdout.is_empty() { output.stderr } else { output.stdout };
            let first = String::from_utf8_lossy(&text).lines().next().unwrap_or_default().trim().to_string();
            DoctorCheck {
                name: name.to_string(),
                passed: true,
                detail: if first.is_empty() { program.clone() } else { first },
            }
        }
        Ok(output) => DoctorCheck {
            name: name.to_string(),
            passed: false,
            detail: format!("{} --version exited with {:?}", program, output.status.code()),
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            passed: false,
            detail: format!("cannot run {}: {}", program, e),
        },
    }
}

/// Run every readiness check for a configuration
pub async fn run_checks(config: &Config) -> DoctorReport {
    let mut report = DoctorReport::default();
    report.checks.push(check_os(std::env::consts::OS));

    for extension in config.interpreters.keys() {
        let command = config.interpreter_for(extension).unwrap_or_default();
        report
            .checks
            .push(check_command(&format!("interpreter .{}", extension), &command).await);
    }

    let mut packages = vec![config.packages.program.clone()];
    packages.extend(config.packages.probe_args.iter().cloned());
    report.checks.push(check_command("package manager", &packages).await);

    report
}
