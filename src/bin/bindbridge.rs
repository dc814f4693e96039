// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! bindbridge - bind or unbind a network adapter below the Windows bridge.

use bridge_tools::bind;
use bridge_tools::config;
use bridge_tools::logging;

fn main() {
  let default_config = config::default_path(bind::APP_NAME);
  let args = match bind::parse_args(std::env::args_os()) {
    Ok(args) => args,
    Err(code) => std::process::exit(code),
  };

  let config = match config::Config::load(args.config.as_deref(), &default_config) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}: {:#}", bind::APP_NAME, e);
      std::process::exit(1);
    }
  };

  if let Err(e) = logging::init(bind::APP_NAME, config.level_filter_with(args.verbose), logging::Sink::Stderr) {
    eprintln!("{}: {}", bind::APP_NAME, e);
  }

  let request = match bind::BindRequest::from_operands(&args.operands, &config.bridge.inf_id) {
    Ok(request) => request,
    Err(e) => {
      println!("{}", e);
      std::process::exit(e.exit_code());
    }
  };

  std::process::exit(run(&request, &config));
}

#[cfg(windows)]
fn run(request: &bind::BindRequest, config: &config::Config) -> i32 {
  use bridge_tools::win32::WindowsBackend;

  let backend = match WindowsBackend::new(config.bridge.lock_timeout_ms) {
    Ok(backend) => backend,
    Err(e) => {
      eprintln!("{}", e);
      return e.exit_code();
    }
  };
  bind::dispatch(request, config.bridge.ics_guard, &backend)
}

#[cfg(not(windows))]
fn run(_request: &bind::BindRequest, _config: &config::Config) -> i32 {
  let e = bridge_tools::Error::Unsupported("bindbridge");
  eprintln!("{}: {}", bind::APP_NAME, e);
  e.exit_code()
}
