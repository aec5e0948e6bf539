//! Suspend by running an external command.
//!
//! Defaults to `systemctl suspend` on Linux and
//! `rundll32.exe powrprof.dll,SetSuspendState 0,1,0` on Windows.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use tracing::info;

use super::SuspendAction;
use super::SuspendError;

/// Spawns a program and waits for it to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSuspend {
    program: String,
    args: Vec<String>,
}

impl CommandSuspend {
    /// Build from a program followed by its arguments.
    pub fn from_argv(argv: &[String]) -> Result<Self, SuspendError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(SuspendError::Unavailable(
                "suspend_command is empty".to_string(),
            ));
        };
        if program.trim().is_empty() {
            return Err(SuspendError::Unavailable(
                "suspend_command has an empty program name".to_string(),
            ));
        }

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// The usual suspend command for this platform.
    pub fn platform_default() -> Result<Self, SuspendError> {
        match default_argv() {
            Some(argv) => {
                let argv: Vec<String> = argv.iter().map(ToString::to_string).collect();
                Self::from_argv(&argv)
            }
            None => Err(SuspendError::Unavailable(format!(
                "no default suspend command on {}; set suspend_command in the config",
                std::env::consts::OS
            ))),
        }
    }

    /// The command line as it will be run.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl SuspendAction for CommandSuspend {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn suspend(&mut self) -> Result<(), SuspendError> {
        info!("Requesting suspend: {}", self.command_line());

        let result = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SuspendError::RequestFailed(format!("Failed to spawn {}: {e}", self.program)))?
            .wait_with_output()
            .await
            .map_err(|e| SuspendError::RequestFailed(format!("Failed to wait for {}: {e}", self.program)))?;

        if result.status.success() {
            debug!("{} exited successfully", self.program);
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            Err(SuspendError::RequestFailed(format!(
                "{} exited with code {:?}: {}",
                self.program,
                result.status.code(),
                stderr.trim()
            )))
        }
    }
}

#[cfg(windows)]
fn default_argv() -> Option<&'static [&'static str]> {
    Some(&["rundll32.exe", "powrprof.dll,SetSuspendState", "0,1,0"])
}

#[cfg(target_os = "linux")]
fn default_argv() -> Option<&'static [&'static str]> {
    Some(&["systemctl", "suspend"])
}

#[cfg(not(any(target_os = "linux", windows)))]
fn default_argv() -> Option<&'static [&'static str]> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_from_argv() {
        let cmd = CommandSuspend::from_argv(&argv(&["loginctl", "suspend"])).unwrap();
        assert_eq!(cmd.command_line(), "loginctl suspend");
    }

    #[test]
    fn test_from_argv_rejects_empty() {
        assert!(CommandSuspend::from_argv(&[]).is_err());
        assert!(CommandSuspend::from_argv(&argv(&[""])).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_platform_default_linux() {
        let cmd = CommandSuspend::platform_default().unwrap();
        assert_eq!(cmd.command_line(), "systemctl suspend");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_command() {
        let mut cmd = CommandSuspend::from_argv(&argv(&["true"])).unwrap();
        assert!(cmd.suspend().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command() {
        let mut cmd = CommandSuspend::from_argv(&argv(&["sh", "-c", "echo denied >&2; exit 3"])).unwrap();
        let err = cmd.suspend().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Some(3)"), "{msg}");
        assert!(msg.contains("denied"), "{msg}");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let mut cmd = CommandSuspend::from_argv(&argv(&["autosleepd-no-such-program"])).unwrap();
        assert!(matches!(cmd.suspend().await, Err(SuspendError::RequestFailed(_))));
    }
}
