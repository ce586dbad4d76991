// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::config::AdapterConfig;
use crate::Error;
use tokio::process::{Child, Command};

/// Owns the child process handle. Distinguishes a graceful exit from a
/// crash by inspecting the exit status rather than relying on any
/// OS-specific wait primitive.
pub struct Subprocess {
    child: Option<Child>,
}

impl Subprocess {
    pub fn not_running() -> Self {
        Self { child: None }
    }

    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Spawn the engine process with piped stdio so its logs can be
    /// captured rather than inherited.
    pub fn spawn(config: &AdapterConfig) -> Result<Self, Error> {
        let mut command = Command::new(&config.engine_command);
        command
            .arg("--model")
            .arg(&config.model_path)
            .arg("--port")
            .arg(config.port.to_string())
            .args(&config.extra_args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn()?;
        Ok(Self { child: Some(child) })
    }

    /// `Ok(None)` if the process is still running, `Ok(Some(status))` if
    /// it has already exited.
    pub fn exit_status(&mut self) -> Result<Option<std::process::ExitStatus>, Error> {
        match &mut self.child {
            Some(child) => Ok(child.try_wait()?),
            None => Ok(None),
        }
    }

    /// Signal the process to terminate gracefully, wait up to
    /// `grace_period` for it to exit on its own, and force-kill it if it
    /// hasn't by then. Resolves once exit is observed either way.
    pub async fn stop(&mut self, grace_period: std::time::Duration) -> Result<(), Error> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        request_termination(&child);

        if tokio::time::timeout(grace_period, child.wait())
            .await
            .is_err()
        {
            tracing::warn!("inference subprocess did not exit within grace period, killing");
            child.kill().await?;
            child.wait().await?;
        }

        Ok(())
    }
}

/// Ask the child to exit on its own terms before the grace period starts
/// (`SIGTERM` on unix); an engine that only reacts to a graceful signal
/// otherwise always burns the full grace period before the hard kill.
#[cfg(unix)]
fn request_termination(child: &Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };

    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(error = %e, "failed to send SIGTERM to inference subprocess");
    }
}

#[cfg(not(unix))]
fn request_termination(_child: &Child) {}
