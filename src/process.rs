//! Child process execution with captured output.
//!
//! [`Cmd`] is a small builder over [`std::process::Command`] that always
//! captures stdout/stderr and reports failures as [`StepError`]s: a program
//! that cannot be started becomes [`StepError::Launch`], a non-zero exit
//! becomes [`StepError::ToolExecution`] unless [`Cmd::allow_fail`] is set.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};
use std::time::Duration;

use tracing::debug;

use crate::artifact::iso::ResolvedCommand;
use crate::error::{Result, StepError};

/// `ETXTBSY` on Linux and macOS.
const TEXT_FILE_BUSY: i32 = 26;

/// Spawn attempts while the executable is still open for writing elsewhere.
const LAUNCH_ATTEMPTS: u64 = 5;

/// Output of a finished child process.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` when the process was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stdout followed by stderr, untrimmed.
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    pub fn describe_status(&self) -> String {
        match self.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Builder for a single captured process invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: PathBuf,
    args: Vec<OsString>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    /// Return non-zero exits as a normal [`CommandResult`] instead of an error.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    pub fn run(self) -> Result<CommandResult> {
        debug!(program = %self.program.display(), args = ?self.args, "running");

        let output = self.spawn_output().map_err(|source| StepError::Launch {
            program: self.program.clone(),
            source,
        })?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() && !self.allow_fail {
            return Err(StepError::ToolExecution {
                program: self.program,
                status: result.describe_status(),
                output: result.combined_output(),
            });
        }

        Ok(result)
    }

    // Only ETXTBSY is retried: the program never started.
    fn spawn_output(&self) -> io::Result<Output> {
        let mut attempt = 1;
        loop {
            match Command::new(&self.program).args(&self.args).output() {
                Err(e) if is_text_file_busy(&e) && attempt < LAUNCH_ATTEMPTS => {
                    debug!(
                        program = %self.program.display(),
                        attempt,
                        "executable busy, retrying launch"
                    );
                    std::thread::sleep(Duration::from_millis(20 * attempt));
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn is_text_file_busy(err: &io::Error) -> bool {
    cfg!(unix) && err.raw_os_error() == Some(TEXT_FILE_BUSY)
}

/// Run a resolved image-creation command once.
///
/// A non-zero exit is returned as `Ok`; only launch failures are errors.
pub fn execute(command: &ResolvedCommand) -> Result<CommandResult> {
    Cmd::new(&command.program)
        .args(&command.args)
        .allow_fail()
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_launch_error() {
        let err = Cmd::new("definitely_not_a_real_command_12345")
            .run()
            .unwrap_err();
        assert!(matches!(err, StepError::Launch { .. }));
    }

    #[test]
    fn test_only_busy_executable_is_retried() {
        assert_eq!(
            is_text_file_busy(&io::Error::from_raw_os_error(TEXT_FILE_BUSY)),
            cfg!(unix)
        );
        assert!(!is_text_file_busy(&io::Error::from(io::ErrorKind::NotFound)));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_both_streams() {
        let result = Cmd::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .run()
            .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.combined_output(), "out\nerr\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error_unless_allowed() {
        let err = Cmd::new("sh").args(["-c", "echo boom >&2; exit 3"]).run();
        match err {
            Err(StepError::ToolExecution { status, output, .. }) => {
                assert_eq!(status, "exit code 3");
                assert_eq!(output, "boom\n");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let result = Cmd::new("sh")
            .args(["-c", "exit 3"])
            .allow_fail()
            .run()
            .unwrap();
        assert_eq!(result.exit_code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_does_not_fail_on_exit_code() {
        let command = ResolvedCommand {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), "exit 7".into()],
        };
        let result = execute(&command).unwrap();
        assert!(!result.success());
        assert_eq!(result.describe_status(), "exit code 7");
    }
}
