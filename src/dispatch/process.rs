//! Child process launch for tool execution
//!
//! The child inherits stdin, stdout and stderr so its output streams live
//! and unmodified. While it runs, interrupt/terminate/hangup signals sent to
//! the orchestrator are relayed to the child and the orchestrator keeps
//! waiting for it to exit.

use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use log::{debug, info};
use tokio::process::{Child, Command};

use super::outcome::ChildExit;

/// Program and argument vector for one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl LaunchSpec {
    /// `interpreter... entry forwarded...`; None when the interpreter is empty
    pub fn new(interpreter: &[String], entry: &Path, forwarded: &[OsString]) -> Option<Self> {
        let (program, interpreter_args) = interpreter.split_first()?;
        let mut args: Vec<OsString> = interpreter_args.iter().map(OsString::from).collect();
        args.push(entry.as_os_str().to_os_string());
        args.extend(forwarded.iter().cloned());
        Some(Self {
            program: OsString::from(program),
            args,
        })
    }
}

/// Which operator signals are relayed to the running child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRelay {
    /// Relay SIGINT; terminate and hangup are always relayed
    pub interrupt: bool,
}

impl SignalRelay {
    /// Relay every handled signal
    pub fn all() -> Self {
        Self { interrupt: true }
    }

    /// Skip SIGINT when a terminal Ctrl-C already reaches the child
    ///
    /// The child shares the orchestrator's process group, so when that group
    /// is the terminal's foreground group the tty delivers SIGINT to both.
    pub fn for_terminal() -> Self {
        Self {
            interrupt: !shares_foreground_group(),
        }
    }
}

#[cfg(unix)]
fn shares_foreground_group() -> bool {
    use nix::unistd::{getpgrp, tcgetpgrp};

    tcgetpgrp(std::io::stdin()).is_ok_and(|foreground| foreground == getpgrp())
}

#[cfg(not(unix))]
fn shares_foreground_group() -> bool {
    true
}

/// Spawn the child with inherited stdio and wait for it to exit
pub async fn run_streaming(spec: &LaunchSpec, relay: SignalRelay) -> std::io::Result<ChildExit> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()?;

    debug!("Spawned {:?} as pid {:?} ({:?})", spec.program, child.id(), relay);
    let status = wait_forwarding_signals(&mut child, relay).await?;
    Ok(ChildExit::from(status))
}

#[cfg(unix)]
async fn wait_forwarding_signals(child: &mut Child, relay: SignalRelay) -> std::io::Result<ExitStatus> {
    use nix::sys::signal::Signal;
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let pid = child.id();

    loop {
        tokio::select! {
            status = child.wait() => return status,
            Some(()) = interrupt.recv() => {
                if relay.interrupt {
                    forward_signal(pid, Signal::SIGINT);
                } else {
                    debug!("Terminal delivered SIGINT to child {:?} directly", pid);
                }
            }
            Some(()) = terminate.recv() => forward_signal(pid, Signal::SIGTERM),
            Some(()) = hangup.recv() => forward_signal(pid, Signal::SIGHUP),
        }
    }
}

#[cfg(not(unix))]
async fn wait_forwarding_signals(child: &mut Child, _relay: SignalRelay) -> std::io::Result<ExitStatus> {
    // console interrupts reach every process attached to the console
    child.wait().await
}

#[cfg(unix)]
fn forward_signal(pid: Option<u32>, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    info!("Forwarding {:?} to child {}", signal, pid);
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to forward {:?} to {}: {}", signal, pid, e),
    }
}
