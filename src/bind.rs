// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! `bindbridge`: enabling or disabling the binding of a device below a
//! bridge component.
//!
//! The flow is platform independent. The network configuration subsystem
//! sits behind `NetConfig` and `BridgeBackend`; `crate::win32` provides the
//! COM implementation.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::clap;
use crate::log;

use clap::error::ErrorKind;
use clap::Parser;

use crate::error::{EXIT_FAILURE, EXIT_OK};
use crate::sharing::IcsGuard;
use crate::Error;

pub const APP_NAME: &'static str = "bindbridge";

pub const USAGE: &'static str = "Usage: bindbridge [<bridgeId>] <deviceId> <bind|unbind>";

/// Inf id of the Windows MAC bridge.
pub const DEFAULT_INF_ID: &'static str = "ms_bridge";

/// Joins the component inf id and the device id in a binding path token.
pub const PATH_TOKEN_SEPARATOR: &'static str = "->";

#[derive(Parser, Debug)]
#[clap(name = APP_NAME, author, version, about, long_about = None)]
pub struct Args {
  /// Configuration file
  #[clap(short = 'c', long, value_parser)]
  pub config: Option<PathBuf>,

  /// Raise the log level (repeatable)
  #[clap(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// [<bridgeId>] <deviceId> <bind|unbind>
  #[clap(required = true, num_args = 2..=3, value_name = "OPERAND")]
  pub operands: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindAction {
  Bind,
  Unbind,
}

impl BindAction {
  pub fn enables(self) -> bool {
    self == BindAction::Bind
  }
}

impl FromStr for BindAction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "bind" => Ok(BindAction::Bind),
      "unbind" => Ok(BindAction::Unbind),
      _ => Err(Error::Usage(USAGE)),
    }
  }
}

impl fmt::Display for BindAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      BindAction::Bind => "bind",
      BindAction::Unbind => "unbind",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
  pub inf_id: String,
  pub device_id: String,
  pub action: BindAction,
}

impl BindRequest {
  /// `[<bridgeId>] <deviceId> <bind|unbind>`; the bridge defaults to
  /// `default_inf_id`.
  pub fn from_operands(operands: &[String], default_inf_id: &str) -> Result<Self, Error> {
    let (inf_id, device_id, action) = match operands {
      [device_id, action] => (default_inf_id, device_id, action),
      [inf_id, device_id, action] => (inf_id.as_str(), device_id, action),
      _ => return Err(Error::Usage(USAGE)),
    };
    Ok(BindRequest {
      inf_id: inf_id.to_string(),
      device_id: device_id.clone(),
      action: action.parse()?,
    })
  }

  pub fn path_token(&self) -> String {
    path_token(&self.inf_id, &self.device_id)
  }
}

/// The token of the binding path from `inf_id` down to `device_id`.
pub fn path_token(inf_id: &str, device_id: &str) -> String {
  format!("{}{}{}", inf_id, PATH_TOKEN_SEPARATOR, device_id)
}

/// A binding path as enumerated by the configuration subsystem.
pub trait BindingPath {
  fn token(&self) -> Result<String, Error>;
}

/// A locked, initialized network configuration.
pub trait NetConfig {
  type Path: BindingPath;

  /// Binding paths below the component `inf_id`, in enumeration order. An
  /// `Err` item ends the enumeration.
  fn paths_below<'a>(&'a self, inf_id: &str) -> Result<Box<dyn Iterator<Item = Result<Self::Path, Error>> + 'a>, Error>;

  fn set_enabled(&self, path: &Self::Path, enable: bool) -> Result<(), Error>;

  /// Commit every pending change.
  fn apply(&self) -> Result<(), Error>;
}

/// What `bindbridge` needs from the platform.
pub trait BridgeBackend {
  type Config: NetConfig;

  /// Acquire the write lock and initialize the configuration. Dropping the
  /// returned value releases both.
  fn open_config(&self) -> Result<Self::Config, Error>;

  /// Fail if `device_id` is shared through ICS.
  fn ensure_not_shared(&self, device_id: &str) -> Result<(), Error>;
}

/// The first path whose token equals `token`. Paths whose token can't be
/// read are skipped.
pub fn find_binding_path<P, I>(paths: I, token: &str) -> Option<P>
where
  P: BindingPath,
  I: IntoIterator<Item = Result<P, Error>>,
{
  for path in paths {
    let path = match path {
      Ok(path) => path,
      Err(e) => {
        log::debug!("binding path enumeration stopped: {}", e);
        break;
      }
    };
    match path.token() {
      Ok(candidate) if candidate == token => return Some(path),
      Ok(candidate) => log::trace!("skipping binding path {}", candidate),
      Err(e) => log::debug!("skipping binding path with unreadable token: {}", e),
    }
  }
  None
}

/// Find the path `token` below `inf_id`, toggle it and apply. A missing path
/// is reported as a failure to toggle, and nothing is applied.
pub fn toggle_binding_path<C>(config: &C, inf_id: &str, token: &str, enable: bool) -> Result<(), Error>
where
  C: NetConfig + ?Sized,
{
  let paths = config.paths_below(inf_id)?;
  let path = find_binding_path(paths, token).ok_or_else(|| Error::TogglePath {
    enable,
    reason: format!("no binding path matches {}", token),
  })?;

  config
    .set_enabled(&path, enable)
    .map_err(|e| Error::TogglePath { enable, reason: e.to_string() })?;
  config.apply()
}

pub fn execute<B: BridgeBackend + ?Sized>(request: &BindRequest, guard: IcsGuard, backend: &B) -> Result<(), Error> {
  if guard.applies_to(request.action) {
    backend.ensure_not_shared(&request.device_id)?;
  }

  let config = backend.open_config()?;
  toggle_binding_path(&config, &request.inf_id, &request.path_token(), request.action.enables())
}

/// Run `request`, printing progress, and return the exit status.
pub fn dispatch<B: BridgeBackend + ?Sized>(request: &BindRequest, guard: IcsGuard, backend: &B) -> i32 {
  match request.action {
    BindAction::Bind => println!("Binding {} to bridge...", request.device_id),
    BindAction::Unbind => println!("Unbinding {} from bridge...", request.device_id),
  }

  match execute(request, guard, backend) {
    Ok(()) => {
      match request.action {
        BindAction::Bind => println!("Device {} bound to bridge.", request.device_id),
        BindAction::Unbind => println!("Device {} unbound from bridge.", request.device_id),
      }
      EXIT_OK
    }
    Err(e) => {
      log::error!("{} {} failed: {}", request.action, request.device_id, e);
      eprintln!("{}", e);
      if e.is_retryable() {
        eprintln!("No change was made; run {} again once the lock is released.", APP_NAME);
      }
      e.exit_code()
    }
  }
}

/// Parse the command line. On failure the usage line (or clap's help and
/// version output) has been printed and the exit status is returned.
pub fn parse_args<I, T>(argv: I) -> Result<Args, i32>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString> + Clone,
{
  match Args::try_parse_from(argv) {
    Ok(args) => Ok(args),
    Err(e) => match e.kind() {
      ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
        let _ = e.print();
        Err(EXIT_OK)
      }
      _ => {
        log::debug!("{}", e);
        println!("{}", USAGE);
        Err(EXIT_FAILURE)
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Position in the enumeration and token. An empty token can't be read.
  struct Path(usize, &'static str);

  impl BindingPath for Path {
    fn token(&self) -> Result<String, Error> {
      if self.1.is_empty() {
        Err(Error::NetCfg("token unavailable".into()))
      } else {
        Ok(self.1.to_string())
      }
    }
  }

  fn enumerate(tokens: &[&'static str]) -> Vec<Result<Path, Error>> {
    tokens.iter().enumerate().map(|(i, token)| Ok(Path(i, *token))).collect()
  }

  fn operands(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn token_joins_inf_id_and_device() {
    assert_eq!(path_token("ms_bridge", "{1234}"), "ms_bridge->{1234}");
  }

  #[test]
  fn three_operands_name_the_bridge() {
    let request = BindRequest::from_operands(&operands(&["br0", "dev123", "bind"]), DEFAULT_INF_ID).unwrap();
    assert_eq!(request, BindRequest { inf_id: "br0".into(), device_id: "dev123".into(), action: BindAction::Bind });
    assert_eq!(request.path_token(), "br0->dev123");
  }

  #[test]
  fn two_operands_use_the_default_bridge() {
    let request = BindRequest::from_operands(&operands(&["dev123", "unbind"]), DEFAULT_INF_ID).unwrap();
    assert_eq!(request.inf_id, "ms_bridge");
    assert_eq!(request.action, BindAction::Unbind);
  }

  #[test]
  fn unknown_action_is_a_usage_error() {
    let err = BindRequest::from_operands(&operands(&["br0", "dev123", "toggle"]), DEFAULT_INF_ID).unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
    assert_eq!(err.exit_code(), 1);
  }

  #[test]
  fn wrong_operand_count_fails_to_parse() {
    assert_eq!(parse_args(["bindbridge"]).unwrap_err(), 1);
    assert_eq!(parse_args(["bindbridge", "dev123"]).unwrap_err(), 1);
    assert_eq!(parse_args(["bindbridge", "a", "b", "c", "d"]).unwrap_err(), 1);
    assert!(parse_args(["bindbridge", "dev123", "bind"]).is_ok());
  }

  #[test]
  fn first_matching_path_wins() {
    let paths = enumerate(&["ms_bridge->a", "ms_bridge->b", "ms_bridge->b"]);
    let found = find_binding_path(paths, "ms_bridge->b").unwrap();
    assert_eq!(found.0, 1);
  }

  #[test]
  fn absent_token_finds_nothing() {
    assert!(find_binding_path(enumerate(&["ms_bridge->a"]), "ms_bridge->b").is_none());
    assert!(find_binding_path(enumerate(&[]), "ms_bridge->b").is_none());
  }

  #[test]
  fn lookup_needs_exact_equality() {
    let paths = enumerate(&["ms_bridge->dev1234", "MS_BRIDGE->dev123", "ms_bridge->dev123 "]);
    assert!(find_binding_path(paths, "ms_bridge->dev123").is_none());
  }

  #[test]
  fn unreadable_tokens_are_skipped() {
    let found = find_binding_path(enumerate(&["", "ms_bridge->a"]), "ms_bridge->a").unwrap();
    assert_eq!(found.0, 1);
  }

  #[test]
  fn enumeration_error_ends_the_search() {
    let paths = vec![Err(Error::BindingEnum("E_FAIL".into())), Ok(Path(1, "ms_bridge->a"))];
    assert!(find_binding_path(paths, "ms_bridge->a").is_none());
  }
}
