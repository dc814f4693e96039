// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
use winreg::RegKey;

use crate::log;
use crate::sharing::{match_adapter, AdapterEntry, AdapterRegistry};
use crate::Error;

/// Network adapter device class.
const ADAPTER_CLASS_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Class\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Adapter lookup through the network device class keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassRegistry;

impl ClassRegistry {
  fn entries(&self) -> Result<Vec<AdapterEntry>, Error> {
    let class = RegKey::predef(HKEY_LOCAL_MACHINE)
      .open_subkey_with_flags(ADAPTER_CLASS_KEY, KEY_READ)
      .map_err(|e| Error::Sharing(format!("can't open HKLM\\{}: {}", ADAPTER_CLASS_KEY, e)))?;

    let mut entries = Vec::new();
    for name in class.enum_keys().filter_map(Result::ok) {
      // "Properties" and friends are not readable; they are not adapters either
      let key = match class.open_subkey_with_flags(&name, KEY_READ) {
        Ok(key) => key,
        Err(_) => continue,
      };
      let instance_id: String = match key.get_value("NetCfgInstanceId") {
        Ok(id) => id,
        Err(_) => continue,
      };
      let device_instance_id: Option<String> = key.get_value("DeviceInstanceID").ok();
      log::trace!("adapter {} -> {} ({:?})", name, instance_id, device_instance_id);
      entries.push(AdapterEntry { instance_id, device_instance_id });
    }
    Ok(entries)
  }
}

impl AdapterRegistry for ClassRegistry {
  fn instance_id(&self, device_id: &str) -> Result<Option<String>, Error> {
    Ok(match_adapter(self.entries()?, device_id))
  }
}
