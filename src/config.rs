// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Configuration shared by `qemu-bridge` and `bindbridge`.
//!
//! Every key is optional. A missing default file means built-in defaults;
//! a file named explicitly with `-c` has to exist.

use std::path::{Path, PathBuf};

use crate::anyhow;
use crate::serde;
use crate::toml;

use anyhow::Context;
use serde::Deserialize;
use crate::log;
use log::LevelFilter;

use crate::bind::DEFAULT_INF_ID;
use crate::sharing::IcsGuard;

/// Configuration for the bridge tools.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub log_level: LogLevel,
  pub tools: ToolsConfig,
  pub bridge: BridgeConfig,
}

impl Config {
  /// read the configuration from a file.
  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))?;
    Self::parse(&config_str).with_context(|| format!("failed to parse {}", path.display()))
  }

  /// parse the configuration from TOML text.
  pub fn parse(config_str: &str) -> Result<Self, anyhow::Error> {
    let config = toml::from_str(config_str)?;
    Ok(config)
  }

  /// Load `explicit` if given, else `default_path` if it exists, else defaults.
  pub fn load(explicit: Option<&Path>, default_path: &Path) -> Result<Self, anyhow::Error> {
    match explicit {
      Some(path) => Self::from_path(path),
      None if default_path.exists() => Self::from_path(default_path),
      None => Ok(Self::default()),
    }
  }

  /// The configured level raised by `verbosity` steps (`-v`, `-vv`, ...).
  pub fn level_filter_with(&self, verbosity: u8) -> LevelFilter {
    self.log_level.raised(verbosity).into()
  }
}

/// Where the default configuration file lives for `app_name`.
#[cfg(unix)]
pub fn default_path(app_name: &str) -> PathBuf {
  PathBuf::from(format!("/etc/{}/{}.toml", app_name, app_name))
}

/// Where the default configuration file lives for `app_name`.
#[cfg(not(unix))]
pub fn default_path(app_name: &str) -> PathBuf {
  let file_name = format!("{}.toml", app_name);
  match std::env::current_exe() {
    Ok(exe) => exe.with_file_name(file_name),
    Err(_) => PathBuf::from(file_name),
  }
}

/// External programs and devices used by `qemu-bridge`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
  pub ip: String,
  pub ifconfig: String,
  pub brctl: String,

  /// TUN/TAP control device.
  pub tun_device: PathBuf,
}

impl Default for ToolsConfig {
  fn default() -> Self {
    ToolsConfig {
      ip: "ip".to_string(),
      ifconfig: "ifconfig".to_string(),
      brctl: "brctl".to_string(),
      tun_device: PathBuf::from("/dev/net/tun"),
    }
  }
}

/// Settings for `bindbridge`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
  /// Bridge component used when the command line names only the device.
  pub inf_id: String,

  /// Which operations are refused on a connection shared through ICS.
  pub ics_guard: IcsGuard,

  /// How long to wait for the network configuration write lock.
  pub lock_timeout_ms: u32,
}

impl Default for BridgeConfig {
  fn default() -> Self {
    BridgeConfig {
      inf_id: DEFAULT_INF_ID.to_string(),
      ics_guard: IcsGuard::default(),
      lock_timeout_ms: 5000,
    }
  }
}

/// Log level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Off,
  Error,
  Warn,
  Info,
  Debug,
  Trace,
}

impl LogLevel {
  /// Step up `steps` levels, saturating at `Trace`.
  pub fn raised(self, steps: u8) -> LogLevel {
    const ORDER: [LogLevel; 6] = [LogLevel::Off, LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug, LogLevel::Trace];
    let current = ORDER.iter().position(|level| *level == self).unwrap_or(0);
    ORDER[(current + steps as usize).min(ORDER.len() - 1)]
  }
}

impl Default for LogLevel {
  fn default() -> Self {
    LogLevel::Warn
  }
}

impl From<LogLevel> for LevelFilter {
  fn from(value: LogLevel) -> Self {
    match value {
      LogLevel::Off => LevelFilter::Off,
      LogLevel::Error => LevelFilter::Error,
      LogLevel::Warn => LevelFilter::Warn,
      LogLevel::Info => LevelFilter::Info,
      LogLevel::Debug => LevelFilter::Debug,
      LogLevel::Trace => LevelFilter::Trace,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.tools.ip, "ip");
    assert_eq!(config.tools.tun_device, PathBuf::from("/dev/net/tun"));
    assert_eq!(config.bridge.inf_id, "ms_bridge");
    assert_eq!(config.bridge.ics_guard, IcsGuard::Bind);
    assert_eq!(config.level_filter_with(0), LevelFilter::Warn);
  }

  #[test]
  fn partial_tables_keep_remaining_defaults() {
    let config = Config::parse(
      r#"
        log_level = "debug"

        [tools]
        brctl = "/usr/sbin/brctl"

        [bridge]
        ics_guard = "always"
      "#,
    )
    .unwrap();
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.tools.brctl, "/usr/sbin/brctl");
    assert_eq!(config.tools.ifconfig, "ifconfig");
    assert_eq!(config.bridge.ics_guard, IcsGuard::Always);
    assert_eq!(config.bridge.lock_timeout_ms, 5000);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    assert!(Config::parse("loglevel = \"info\"").is_err());
    assert!(Config::parse("[tools]\nbrctrl = \"x\"").is_err());
  }

  #[test]
  fn missing_default_file_falls_back_to_defaults() {
    let config = Config::load(None, Path::new("/nonexistent/qemu-bridge.toml")).unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn missing_explicit_file_is_an_error() {
    let missing = Path::new("/nonexistent/qemu-bridge.toml");
    let err = Config::load(Some(missing), missing).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/qemu-bridge.toml"));
  }

  #[test]
  fn verbosity_raises_and_saturates() {
    assert_eq!(LogLevel::Warn.raised(0), LogLevel::Warn);
    assert_eq!(LogLevel::Warn.raised(1), LogLevel::Info);
    assert_eq!(LogLevel::Warn.raised(2), LogLevel::Debug);
    assert_eq!(LogLevel::Warn.raised(9), LogLevel::Trace);
    assert_eq!(Config::default().level_filter_with(1), LevelFilter::Info);
  }
}
