// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Errors reported by both tools, and the exit codes they map to.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for success.
pub const EXIT_OK: i32 = 0;

/// Exit status for usage errors and failed operations.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status when the sharing manager or the adapter registry can't be read.
pub const EXIT_SHARING_UNAVAILABLE: i32 = -1;

/// Exit status when the device is shared through ICS.
pub const EXIT_SHARED_CONNECTION: i32 = -2;

/// One step of the `/dev/net/tun` ioctl sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapStep {
  Attach,
  Owner,
  Group,
  Persist,
  Unpersist,
}

impl fmt::Display for TapStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TapStep::Attach => "TUNSETIFF",
      TapStep::Owner => "TUNSETOWNER",
      TapStep::Group => "TUNSETGROUP",
      TapStep::Persist => "enabling TUNSETPERSIST",
      TapStep::Unpersist => "disabling TUNSETPERSIST",
    };
    f.write_str(name)
  }
}

fn applied_suffix(applied: &[TapStep]) -> String {
  if applied.is_empty() {
    return String::new();
  }
  let steps: Vec<String> = applied.iter().map(|step| step.to_string()).collect();
  format!(" (already applied: {})", steps.join(", "))
}

fn toggle_verb(enable: &bool) -> &'static str {
  if *enable { "enable" } else { "disable" }
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() { String::new() } else { format!(": {}", stderr) }
}

struct PathDisplay<'a>(&'a PathBuf);

impl fmt::Display for PathDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Bad arity or unknown verb. Carries the usage line to print.
  #[error("{0}")]
  Usage(&'static str),

  #[error("configuration error: {0}")]
  Config(String),

  #[error("failed to initialize logging: {0}")]
  Logging(String),

  #[error(transparent)]
  Io(#[from] io::Error),

  #[error("invalid interface name '{name}': {reason}")]
  InvalidName { name: String, reason: &'static str },

  #[error("'{0}' is neither a username nor a numeric uid.")]
  UnknownUser(String),

  #[error("'{0}' is neither a group name nor a numeric gid.")]
  UnknownGroup(String),

  #[error("failed to run `{command}`: {source}")]
  Spawn { command: String, source: io::Error },

  /// The external utility ran but did not exit successfully.
  #[error("`{command}` failed with {status}{}", stderr_suffix(.stderr))]
  CommandFailed { command: String, status: String, stderr: String },

  #[error("Failed to open '{}': {source}", PathDisplay(.path))]
  TapOpen { path: PathBuf, source: io::Error },

  /// An ioctl of the TAP sequence failed. `applied` lists the steps that
  /// already took effect; nothing is rolled back.
  #[error("{step} on '{ifname}' failed{}: {source}", applied_suffix(.applied))]
  TapSetup { ifname: String, step: TapStep, applied: Vec<TapStep>, source: io::Error },

  #[error("{holder} currently holds the lock, try later.")]
  LockHeld { holder: String },

  #[error("Couldn't get the notify object interface: {0}")]
  NotifyObject(String),

  #[error("Couldn't get an interface pointer to {0}.")]
  ComponentNotFound(String),

  #[error("Couldn't get the binding path enumerator interface: {0}")]
  BindingEnum(String),

  #[error("network configuration call failed: {0}")]
  NetCfg(String),

  #[error("Failed to {} the binding path: {reason}", toggle_verb(.enable))]
  TogglePath { enable: bool, reason: String },

  #[error("Failed to apply changes to the binding path: {0}")]
  Apply(String),

  #[error("couldn't inspect connection sharing: {0}")]
  Sharing(String),

  #[error("'{0}' is shared through Internet Connection Sharing; disable sharing before bridging it")]
  SharedConnection(String),

  #[error("{0} is not supported on this platform")]
  Unsupported(&'static str),
}

impl Error {
  /// Process exit status for this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::Sharing(_) => EXIT_SHARING_UNAVAILABLE,
      Error::SharedConnection(_) => EXIT_SHARED_CONNECTION,
      _ => EXIT_FAILURE,
    }
  }

  /// True when the failure is transient and the caller may retry later.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Error::LockHeld { .. })
  }
}

impl From<anyhow::Error> for Error {
  fn from(e: anyhow::Error) -> Self {
    Error::Config(format!("{:#}", e))
  }
}
