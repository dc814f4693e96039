// -*- indent-tabs-mode: nil; tab-width: 4; -*-
// vim: set ts=4 sw=4 et ai :

//! Host-side helpers for attaching virtual machine interfaces to bridges.
//!
//! `qemu-bridge` drives TAP devices and Linux bridges, `bindbridge` toggles
//! the Windows bridge binding of a network adapter.

pub use anyhow;
pub use clap;
pub use env_logger;
pub use log;
pub use serde;
pub use toml;

#[cfg(unix)]
pub use libc;
#[cfg(unix)]
pub use nix;
#[cfg(unix)]
pub use syslog;

#[cfg(windows)]
pub use windows;
#[cfg(windows)]
pub use winreg;

pub mod error;
pub mod config;
pub mod logging;
pub mod command;
pub mod bridge;
pub mod bind;
pub mod sharing;

#[cfg(unix)]
pub mod owner;

#[cfg(target_os = "linux")]
pub mod tap;
#[cfg(target_os = "linux")]
pub mod host;

#[cfg(windows)]
pub mod win32;

pub use config::Config;
pub use error::{Error, Result};
