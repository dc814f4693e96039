// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! qemu-bridge - TAP and bridge plumbing for bridged virtual machines.
//! Usually run through sudo by the hypervisor driver.

use bridge_tools::bridge;

#[cfg(target_os = "linux")]
fn main() {
  use bridge_tools::config;
  use bridge_tools::host::SystemHost;
  use bridge_tools::logging;

  let args = match bridge::parse_args(std::env::args_os()) {
    Ok(args) => args,
    Err(code) => std::process::exit(code),
  };

  let config = match config::Config::load(args.config.as_deref(), &config::default_path(bridge::APP_NAME)) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}: {:#}", bridge::APP_NAME, e);
      std::process::exit(1);
    }
  };

  let sink = logging::Sink::from_flag(args.syslog);
  if let Err(e) = logging::init(bridge::APP_NAME, config.level_filter_with(args.verbose), sink) {
    eprintln!("{}: {}", bridge::APP_NAME, e);
  }

  let host = SystemHost::new(&config.tools);
  std::process::exit(bridge::dispatch(&args.verb, &config, &host));
}

#[cfg(not(target_os = "linux"))]
fn main() {
  if let Err(code) = bridge::parse_args(std::env::args_os()) {
    std::process::exit(code);
  }
  eprintln!("{}: {}", bridge::APP_NAME, bridge_tools::Error::Unsupported("qemu-bridge"));
  std::process::exit(1);
}
