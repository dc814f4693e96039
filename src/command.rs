// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Running the external network utilities (`ip`, `ifconfig`, `brctl`).
//!
//! Programs are executed directly with an argument vector, never through a
//! shell, and their exit status is checked.

use std::fmt;
use std::process::{Command, Output};
use std::time::Instant;

use crate::log;
use crate::Error;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
  pub program: String,
  pub args: Vec<String>,
}

impl ShellCommand {
  pub fn new<P, I, S>(program: P, args: I) -> Self
  where
    P: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    ShellCommand {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }
}

impl fmt::Display for ShellCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Something that can execute a `ShellCommand`.
pub trait CommandRunner {
  /// Run to completion and return the captured output, whatever the status.
  fn run(&self, command: &ShellCommand) -> Result<Output, Error>;
}

/// Spawns real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, command: &ShellCommand) -> Result<Output, Error> {
    let start = Instant::now();
    log::debug!("running `{}`", command);
    let output = Command::new(&command.program)
      .args(&command.args)
      .output()
      .map_err(|source| Error::Spawn { command: command.to_string(), source })?;

    log::trace!("`{}` returned {:?} in {}ms", command, output, start.elapsed().as_millis());
    Ok(output)
  }
}

/// Run `command` and turn a non-zero exit (or death by signal) into an error.
pub fn run_checked<R: CommandRunner + ?Sized>(runner: &R, command: &ShellCommand) -> Result<Output, Error> {
  let output = runner.run(command)?;
  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    log::warn!("`{}` exited with {}", command, output.status);
    return Err(Error::CommandFailed {
      command: command.to_string(),
      status: output.status.to_string(),
      stderr,
    });
  }
  Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use std::os::unix::process::ExitStatusExt;
  use std::process::ExitStatus;

  struct Canned {
    status: i32,
    stderr: &'static str,
  }

  impl CommandRunner for Canned {
    fn run(&self, _command: &ShellCommand) -> Result<Output, Error> {
      Ok(Output {
        status: ExitStatus::from_raw(self.status),
        stdout: Vec::new(),
        stderr: self.stderr.as_bytes().to_vec(),
      })
    }
  }

  #[test]
  fn display_joins_program_and_args() {
    let command = ShellCommand::new("ip", ["link", "set", "eth0", "down"]);
    assert_eq!(command.to_string(), "ip link set eth0 down");
  }

  #[test]
  fn zero_exit_is_success() {
    let command = ShellCommand::new("brctl", ["addif", "br0", "tap0"]);
    assert!(run_checked(&Canned { status: 0, stderr: "" }, &command).is_ok());
  }

  #[test]
  fn nonzero_exit_is_reported_with_stderr() {
    let command = ShellCommand::new("brctl", ["addif", "br0", "tap0"]);
    // wait status 1 << 8 is "exited with 1"
    let err = run_checked(&Canned { status: 256, stderr: "bridge br0 does not exist!\n" }, &command).unwrap_err();
    match err {
      Error::CommandFailed { command, stderr, .. } => {
        assert_eq!(command, "brctl addif br0 tap0");
        assert_eq!(stderr, "bridge br0 does not exist!");
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[test]
  fn killed_child_is_a_failure() {
    let command = ShellCommand::new("ip", ["link", "set", "eth0", "up"]);
    let err = run_checked(&Canned { status: 9, stderr: "" }, &command).unwrap_err();
    assert!(matches!(err, Error::CommandFailed { .. }));
  }

  #[test]
  fn system_runner_captures_output_and_status() {
    let command = ShellCommand::new("sh", ["-c", "echo out; echo err >&2; exit 3"]);
    let output = SystemRunner.run(&command).unwrap();
    assert_eq!(output.stdout, b"out\n");
    assert_eq!(output.stderr, b"err\n");
    assert_eq!(output.status.code(), Some(3));
  }

  #[test]
  fn missing_program_is_a_spawn_error() {
    let command = ShellCommand::new("/nonexistent/brctl", ["show"]);
    assert!(matches!(SystemRunner.run(&command), Err(Error::Spawn { .. })));
  }
}
