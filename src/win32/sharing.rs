// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! `INetSharingManager`: connection enumeration and ICS state.

use windows::core::{IUnknown, Interface, VARIANT};
use windows::Win32::Foundation::S_OK;
use windows::Win32::NetworkManagement::WindowsFirewall::{INetConnection, INetSharingManager, NetSharingManager};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};
use windows::Win32::System::Ole::IEnumVARIANT;

use super::describe;
use crate::sharing::SharingInspector;
use crate::Error;

fn sharing_error(e: windows::core::Error) -> Error {
  Error::Sharing(describe(&e))
}

pub struct SharingManager {
  manager: INetSharingManager,
}

impl SharingManager {
  pub fn new() -> Result<Self, Error> {
    let manager: INetSharingManager =
      unsafe { CoCreateInstance(&NetSharingManager, None, CLSCTX_ALL) }.map_err(sharing_error)?;
    Ok(SharingManager { manager })
  }
}

impl SharingInspector for SharingManager {
  type Connection = INetConnection;

  fn connections(&self) -> Result<Vec<INetConnection>, Error> {
    let collection = unsafe { self.manager.EnumEveryConnection() }.map_err(sharing_error)?;
    let variants: IEnumVARIANT = unsafe { collection._NewEnum() }.map_err(sharing_error)?.cast().map_err(sharing_error)?;

    let mut connections = Vec::new();
    loop {
      let mut slot = [VARIANT::default()];
      let mut fetched = 0u32;
      let hr = unsafe { variants.Next(&mut slot, &mut fetched) };
      if hr.is_err() {
        return Err(sharing_error(windows::core::Error::from(hr)));
      }
      if hr != S_OK || fetched == 0 {
        break;
      }
      let unknown = IUnknown::try_from(&slot[0]).map_err(sharing_error)?;
      connections.push(unknown.cast::<INetConnection>().map_err(sharing_error)?);
    }
    Ok(connections)
  }

  fn connection_guid(&self, connection: &INetConnection) -> Result<String, Error> {
    let props = unsafe { self.manager.get_NetConnectionProps(connection) }.map_err(sharing_error)?;
    let guid = unsafe { props.Guid() }.map_err(sharing_error)?;
    Ok(guid.to_string())
  }

  fn sharing_enabled(&self, connection: &INetConnection) -> Result<bool, Error> {
    let configuration =
      unsafe { self.manager.get_INetSharingConfigurationForINetConnection(connection) }.map_err(sharing_error)?;
    let enabled = unsafe { configuration.SharingEnabled() }.map_err(sharing_error)?;
    Ok(enabled.0 != 0)
  }
}
