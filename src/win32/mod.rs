// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! COM and registry implementations of the `bindbridge` seams.

mod com;
mod netcfg;
mod registry;
mod sharing;

pub use com::{ComApartment, CoTaskString};
pub use netcfg::{ComBindingPath, NetCfgSession};
pub use registry::ClassRegistry;
pub use sharing::SharingManager;

use crate::bind::BridgeBackend;
use crate::Error;

/// `HRESULT` and system message of a failed COM call.
pub(crate) fn describe(e: &windows::core::Error) -> String {
  format!("{} (0x{:08X})", e.message(), e.code().0 as u32)
}

/// The Windows backend. Keeps COM initialized for its lifetime.
pub struct WindowsBackend {
  lock_timeout_ms: u32,
  _apartment: ComApartment,
}

impl WindowsBackend {
  pub fn new(lock_timeout_ms: u32) -> Result<Self, Error> {
    Ok(WindowsBackend { lock_timeout_ms, _apartment: ComApartment::init()? })
  }
}

impl BridgeBackend for WindowsBackend {
  type Config = NetCfgSession;

  fn open_config(&self) -> Result<NetCfgSession, Error> {
    NetCfgSession::open(self.lock_timeout_ms)
  }

  fn ensure_not_shared(&self, device_id: &str) -> Result<(), Error> {
    let manager = SharingManager::new()?;
    crate::sharing::ensure_not_shared(&ClassRegistry, &manager, device_id)
  }
}
