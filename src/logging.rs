// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Log sink selection.

use crate::env_logger;
use crate::log::LevelFilter;

use crate::Error;

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
  /// `env_logger` on stderr. `RUST_LOG` overrides the level.
  Stderr,

  /// The local syslog daemon, facility `LOG_USER`.
  Syslog,
}

impl Sink {
  pub fn from_flag(syslog: bool) -> Sink {
    if syslog { Sink::Syslog } else { Sink::Stderr }
  }
}

/// Install the global logger. Call once, before any operation runs.
pub fn init(app_name: &str, level: LevelFilter, sink: Sink) -> Result<(), Error> {
  match sink {
    Sink::Stderr => env_logger::Builder::new()
      .filter_level(level)
      .parse_default_env()
      .format_timestamp(None)
      .try_init()
      .map_err(|e| Error::Logging(e.to_string())),
    Sink::Syslog => init_syslog(app_name, level),
  }
}

#[cfg(unix)]
fn init_syslog(app_name: &str, level: LevelFilter) -> Result<(), Error> {
  use crate::syslog;

  syslog::init(syslog::Facility::LOG_USER, level, Some(app_name)).map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(not(unix))]
fn init_syslog(_app_name: &str, _level: LevelFilter) -> Result<(), Error> {
  Err(Error::Unsupported("logging to syslog"))
}
