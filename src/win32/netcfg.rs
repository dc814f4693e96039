// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! `INetCfg`: the locked network configuration and its binding paths.

use windows::core::{w, Interface, GUID, HRESULT, HSTRING, PWSTR};
use windows::Win32::Foundation::{BOOL, S_OK};
use windows::Win32::NetworkManagement::NetManagement::{
  IEnumNetCfgBindingPath, INetCfg, INetCfgBindingPath, INetCfgComponent, INetCfgComponentBindings, INetCfgLock, EBP_BELOW,
};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};

use super::{describe, CoTaskString};
use crate::bind::{BindingPath, NetConfig};
use crate::log;
use crate::Error;

/// CLSID of the `CNetCfg` class.
const CLSID_CNETCFG: GUID = GUID::from_u128(0x5b035261_40f9_11d1_aaec_00805fc1270e);

const NETCFG_E_NO_WRITE_LOCK: HRESULT = HRESULT(0x8004A024_u32 as i32);

/// A write-locked, initialized `INetCfg`. Dropping it uninitializes the
/// object and releases the lock.
pub struct NetCfgSession {
  netcfg: INetCfg,
  lock: INetCfgLock,
  initialized: bool,
}

impl NetCfgSession {
  pub fn open(lock_timeout_ms: u32) -> Result<Self, Error> {
    let netcfg: INetCfg = unsafe { CoCreateInstance(&CLSID_CNETCFG, None, CLSCTX_INPROC_SERVER) }
      .map_err(|e| Error::NotifyObject(describe(&e)))?;
    let lock: INetCfgLock = netcfg.cast().map_err(|e| Error::NotifyObject(describe(&e)))?;

    let mut holder = PWSTR::null();
    let acquired = unsafe { lock.AcquireWriteLock(lock_timeout_ms, w!("bindbridge"), &mut holder) };
    let holder = unsafe { CoTaskString::from_raw(holder) };
    match acquired {
      // S_FALSE: the lock is held elsewhere and `holder` names the owner
      Ok(()) if !holder.is_null() => return Err(Error::LockHeld { holder: holder.to_string_lossy() }),
      Ok(()) => {}
      Err(e) if e.code() == NETCFG_E_NO_WRITE_LOCK => {
        let holder = if holder.is_null() { "another application".to_string() } else { holder.to_string_lossy() };
        return Err(Error::LockHeld { holder });
      }
      Err(e) => return Err(Error::NotifyObject(describe(&e))),
    }

    let mut session = NetCfgSession { netcfg, lock, initialized: false };
    unsafe { session.netcfg.Initialize(None) }.map_err(|e| Error::NotifyObject(describe(&e)))?;
    session.initialized = true;
    log::debug!("network configuration locked and initialized");
    Ok(session)
  }

  fn find_component(&self, inf_id: &str) -> Result<INetCfgComponent, Error> {
    let mut component: Option<INetCfgComponent> = None;
    unsafe { self.netcfg.FindComponent(&HSTRING::from(inf_id), Some(&mut component as *mut _)) }
      .map_err(|e| {
        log::debug!("FindComponent({}) failed: {}", inf_id, describe(&e));
        Error::ComponentNotFound(inf_id.to_string())
      })?;
    // S_FALSE leaves the component unset
    component.ok_or_else(|| Error::ComponentNotFound(inf_id.to_string()))
  }
}

impl Drop for NetCfgSession {
  fn drop(&mut self) {
    if self.initialized {
      if let Err(e) = unsafe { self.netcfg.Uninitialize() } {
        log::warn!("INetCfg::Uninitialize failed: {}", describe(&e));
      }
    }
    if let Err(e) = unsafe { self.lock.ReleaseWriteLock() } {
      log::warn!("INetCfgLock::ReleaseWriteLock failed: {}", describe(&e));
    }
  }
}

pub struct ComBindingPath(INetCfgBindingPath);

impl BindingPath for ComBindingPath {
  fn token(&self) -> Result<String, Error> {
    let raw = unsafe { self.0.GetPathToken() }.map_err(|e| Error::NetCfg(describe(&e)))?;
    let token = unsafe { CoTaskString::from_raw(raw) };
    Ok(token.to_string_lossy())
  }
}

struct BindingPaths {
  paths: IEnumNetCfgBindingPath,
  done: bool,
}

impl Iterator for BindingPaths {
  type Item = Result<ComBindingPath, Error>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }

    let mut slot: [Option<INetCfgBindingPath>; 1] = [None];
    let mut fetched = 0u32;
    let hr = unsafe { self.paths.Next(&mut slot, Some(&mut fetched as *mut u32)) };
    if hr != S_OK {
      self.done = true;
      if hr.is_err() {
        return Some(Err(Error::BindingEnum(describe(&windows::core::Error::from(hr)))));
      }
      return None;
    }

    let [path] = slot;
    match path {
      Some(path) => Some(Ok(ComBindingPath(path))),
      None => {
        self.done = true;
        None
      }
    }
  }
}

impl NetConfig for NetCfgSession {
  type Path = ComBindingPath;

  fn paths_below<'a>(&'a self, inf_id: &str) -> Result<Box<dyn Iterator<Item = Result<ComBindingPath, Error>> + 'a>, Error> {
    let component = self.find_component(inf_id)?;
    let bindings: INetCfgComponentBindings = component.cast().map_err(|e| Error::BindingEnum(describe(&e)))?;
    let paths = unsafe { bindings.EnumBindingPaths(EBP_BELOW.0 as u32) }.map_err(|e| Error::BindingEnum(describe(&e)))?;
    Ok(Box::new(BindingPaths { paths, done: false }))
  }

  fn set_enabled(&self, path: &ComBindingPath, enable: bool) -> Result<(), Error> {
    unsafe { path.0.Enable(BOOL::from(enable)) }.map_err(|e| Error::NetCfg(describe(&e)))
  }

  fn apply(&self) -> Result<(), Error> {
    unsafe { self.netcfg.Apply() }.map_err(|e| Error::Apply(describe(&e)))?;
    log::info!("binding changes applied");
    Ok(())
  }
}
