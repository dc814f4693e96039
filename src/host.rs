// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! The Linux host: real child processes and real TUN ioctls.

use std::io::Write;
use std::path::PathBuf;
use std::process::Output;

use crate::bridge::{Host, TapRequest};
use crate::command::{run_checked, CommandRunner, ShellCommand, SystemRunner};
use crate::config::ToolsConfig;
use crate::owner;
use crate::tap;
use crate::Error;

pub struct SystemHost<R = SystemRunner> {
  runner: R,
  tun_device: PathBuf,
}

impl SystemHost<SystemRunner> {
  pub fn new(tools: &ToolsConfig) -> Self {
    SystemHost::with_runner(SystemRunner, tools)
  }
}

impl<R: CommandRunner> SystemHost<R> {
  pub fn with_runner(runner: R, tools: &ToolsConfig) -> Self {
    SystemHost { runner, tun_device: tools.tun_device.clone() }
  }
}

/// Pass a finished command's output through to our own streams.
fn echo_output<O: Write, E: Write>(output: &Output, out: &mut O, err: &mut E) -> Result<(), Error> {
  out.write_all(&output.stdout)?;
  err.write_all(&output.stderr)?;
  Ok(())
}

impl<R: CommandRunner> Host for SystemHost<R> {
  fn run_command(&self, command: &ShellCommand) -> Result<(), Error> {
    let output = run_checked(&self.runner, command)?;
    echo_output(&output, &mut std::io::stdout(), &mut std::io::stderr())?;
    Ok(())
  }

  fn make_tap(&self, request: &TapRequest) -> Result<(), Error> {
    // resolve first so an unknown user leaves the device untouched
    let uid = owner::resolve_owner(request.user.as_deref())?;
    let gid = request.group.as_deref().map(owner::resolve_group).transpose()?;

    tap::create_persistent(&self.tun_device, &request.name, uid, gid)?;

    match gid {
      Some(gid) => println!("Set '{}' persistent and owned by uid {} gid {}", request.name, uid, gid),
      None => println!("Set '{}' persistent and owned by uid {}", request.name, uid),
    }
    Ok(())
  }

  fn delete_tap(&self, name: &str) -> Result<(), Error> {
    tap::clear_persistent(&self.tun_device, name)?;
    println!("Set '{}' nonpersistent", name);
    Ok(())
  }
}
