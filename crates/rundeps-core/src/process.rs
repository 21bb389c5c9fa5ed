//! Subprocess execution behind a trait so installers and hosts can be faked.

use rundeps_util::output::{capture_lossy, MAX_OUTPUT_SIZE};
use rundeps_util::shell;
use serde::Serialize;
use std::fmt;
use std::io;
use std::process::{Command, Stdio};
use tracing::debug;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split an argv prefix into program and leading arguments.
    ///
    /// Returns `None` for an empty argv.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argv, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell::join(self.argv()))
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 if terminated by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands to completion.
pub trait CommandRunner {
    /// Run `command` and wait for it. An `Err` means it could not be started.
    fn run(&self, command: &CommandLine) -> io::Result<CommandOutput>;
}

/// Runs commands as real child processes with captured, size-bounded output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> io::Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let (stdout, stdout_truncated) = capture_lossy(&output.stdout, MAX_OUTPUT_SIZE);
        let (stderr, stderr_truncated) = capture_lossy(&output.stderr, MAX_OUTPUT_SIZE);
        if stdout_truncated || stderr_truncated {
            debug!(program = %command.program, "captured output truncated");
        }

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &CommandLine) -> io::Result<CommandOutput> {
        (**self).run(command)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    fn run(&self, command: &CommandLine) -> io::Result<CommandOutput> {
        (**self).run(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_arguments() {
        let cmd = CommandLine::new("python3")
            .args(["-m", "pip", "install"])
            .arg("pymongo>=3.11.4,<4.0.0");
        assert_eq!(
            cmd.to_string(),
            "python3 -m pip install 'pymongo>=3.11.4,<4.0.0'"
        );
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["python".to_string(), "-m".to_string(), "pip".to_string()];
        let cmd = CommandLine::from_argv(&argv).unwrap();
        assert_eq!(cmd.program, "python");
        assert_eq!(cmd.args, ["-m", "pip"]);
        assert!(CommandLine::from_argv(&[]).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let cmd = CommandLine::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = SystemRunner.run(&cmd).unwrap();
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_system_runner_spawn_failure() {
        let cmd = CommandLine::new("rundeps-definitely-not-a-real-program");
        assert!(SystemRunner.run(&cmd).is_err());
    }
}
