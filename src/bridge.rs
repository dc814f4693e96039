// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! `qemu-bridge`: verbs, the operation each one maps to, and dispatch.
//!
//! Every verb plans exactly one `Operation`; a `Host` carries it out.
//! Parsing failures never reach the host.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::clap;
use crate::log;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use crate::command::ShellCommand;
use crate::config::{Config, ToolsConfig};
use crate::error::{EXIT_FAILURE, EXIT_OK};
use crate::Error;

pub const APP_NAME: &'static str = "qemu-bridge";

pub const USAGE: &'static str = "Usage: qemu-bridge ifup <interface> | ifdown <interface> | ifaddress <interface> <address> | mktap <tapname> <user> [group] | deltap <tapname> | addtobr <br> <tap> | delfrombr <br> <tap>";

#[derive(Parser, Debug)]
#[clap(name = APP_NAME, author, version, about, long_about = None, disable_help_subcommand = true)]
pub struct Args {
  /// Configuration file
  #[clap(short = 'c', long, value_parser)]
  pub config: Option<PathBuf>,

  /// Log to syslog instead of stderr
  #[clap(long)]
  pub syslog: bool,

  /// Raise the log level (repeatable)
  #[clap(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  #[clap(subcommand)]
  pub verb: Verb,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Verb {
  /// Bring an interface up in promiscuous mode
  #[clap(name = "ifup")]
  IfUp { interface: String },

  /// Bring an interface down
  #[clap(name = "ifdown")]
  IfDown { interface: String },

  /// Assign an address to an interface
  #[clap(name = "ifaddress")]
  IfAddress { interface: String, address: String },

  /// Create a persistent TAP device owned by a user (and optionally a group)
  #[clap(name = "mktap")]
  MkTap { tapname: String, user: String, group: Option<String> },

  /// Make a TAP device non-persistent so the kernel removes it
  #[clap(name = "deltap")]
  DelTap { tapname: String },

  /// Attach a TAP device to a bridge
  #[clap(name = "addtobr")]
  AddToBr { bridge: String, tap: String },

  /// Detach a TAP device from a bridge
  #[clap(name = "delfrombr")]
  DelFromBr { bridge: String, tap: String },
}

/// Parameters of a TAP creation. Owner and group are resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapRequest {
  pub name: String,

  /// Username or numeric uid; `None` means the effective uid.
  pub user: Option<String>,

  /// Group name or numeric gid; `None` leaves the group unset.
  pub group: Option<String>,
}

/// The single external action a verb maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  Run(ShellCommand),
  MakeTap(TapRequest),
  DeleteTap(String),
}

impl Verb {
  pub fn plan(&self, tools: &ToolsConfig) -> Operation {
    match self {
      Verb::IfUp { interface } => {
        Operation::Run(ShellCommand::new(&tools.ip, ["link", "set", interface.as_str(), "up", "promisc", "on"]))
      }
      Verb::IfDown { interface } => {
        Operation::Run(ShellCommand::new(&tools.ip, ["link", "set", interface.as_str(), "down"]))
      }
      Verb::IfAddress { interface, address } => {
        Operation::Run(ShellCommand::new(&tools.ifconfig, [interface, address]))
      }
      Verb::MkTap { tapname, user, group } => Operation::MakeTap(TapRequest {
        name: tapname.clone(),
        user: Some(user.clone()),
        group: group.clone(),
      }),
      Verb::DelTap { tapname } => Operation::DeleteTap(tapname.clone()),
      Verb::AddToBr { bridge, tap } => {
        Operation::Run(ShellCommand::new(&tools.brctl, ["addif", bridge.as_str(), tap.as_str()]))
      }
      Verb::DelFromBr { bridge, tap } => {
        Operation::Run(ShellCommand::new(&tools.brctl, ["delif", bridge.as_str(), tap.as_str()]))
      }
    }
  }
}

/// Carries out planned operations.
pub trait Host {
  fn run_command(&self, command: &ShellCommand) -> Result<(), Error>;
  fn make_tap(&self, request: &TapRequest) -> Result<(), Error>;
  fn delete_tap(&self, name: &str) -> Result<(), Error>;
}

pub fn execute<H: Host + ?Sized>(host: &H, operation: &Operation) -> Result<(), Error> {
  match operation {
    Operation::Run(command) => host.run_command(command),
    Operation::MakeTap(request) => host.make_tap(request),
    Operation::DeleteTap(name) => host.delete_tap(name),
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

/// Plan and execute `verb`, returning the exit status.
pub fn dispatch<H: Host + ?Sized>(verb: &Verb, config: &Config, host: &H) -> i32 {
  let operation = verb.plan(&config.tools);
  log::debug!("{:?} -> {:?}", verb, operation);
  match execute(host, &operation) {
    Ok(()) => EXIT_OK,
    Err(e) => {
      log::error!("{:?} failed: {}", verb, e);
      eprintln!("{}: {}", APP_NAME, e);
      e.exit_code()
    }
  }
}

/// Parse `argv` and dispatch it against `host`.
pub fn run_with<I, T, H>(argv: I, config: &Config, host: &H) -> i32
where
  I: IntoIterator<Item = T>,
  T: Into<OsString> + Clone,
  H: Host + ?Sized,
{
  match parse_args(argv) {
    Ok(args) => dispatch(&args.verb, config, host),
    Err(code) => code,
  }
}
