// components/audio_tools/src/command.rs
use std::ffi::{OsStr, OsString};

use async_trait::async_trait;
use tokio::process::Command;

use crate::types::ToolError;

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs external programs
///
/// A non-zero exit status is reported as [`ToolError::CommandExitCode`].
#[async_trait]
pub trait CommandRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ToolError>;
}

/// Runs programs as child processes of this one
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ToolError> {
        let command_line = describe(program, args);
        tracing::debug!("running {}", command_line);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| ToolError::CommandFailed {
                command: command_line.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::CommandExitCode {
                command: command_line,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Human readable command line for logs and errors
pub fn describe(program: &str, args: &[OsString]) -> String {
    std::iter::once(OsStr::new(program))
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn describe_joins_program_and_args() {
        let args: Vec<OsString> = vec!["-i".into(), "my file.m4a".into()];
        assert_eq!(describe("ffmpeg", &args), "ffmpeg -i my file.m4a");
    }

    #[tokio::test]
    async fn missing_program_is_command_failure() {
        let result = SystemRunner
            .run("narr-test-program-that-does-not-exist", &[])
            .await;

        assert_matches!(result, Err(ToolError::CommandFailed { .. }));
    }
}
