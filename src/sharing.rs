// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Refusing to bridge a connection that is shared through ICS.

use crate::log;
use crate::serde;

use serde::Deserialize;

use crate::bind::BindAction;
use crate::Error;

/// Which operations the ICS check runs before.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IcsGuard {
  /// Only `bind`: unbinding a shared connection creates no new hazard.
  #[default]
  Bind,

  /// Both `bind` and `unbind`.
  Always,

  /// Never.
  Off,
}

impl IcsGuard {
  pub fn applies_to(self, action: BindAction) -> bool {
    match self {
      IcsGuard::Bind => action == BindAction::Bind,
      IcsGuard::Always => true,
      IcsGuard::Off => false,
    }
  }
}

/// One network adapter key of the registry class tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEntry {
  /// `NetCfgInstanceId`, the adapter GUID.
  pub instance_id: String,

  /// `DeviceInstanceID`, the PnP device path, when present.
  pub device_instance_id: Option<String>,
}

/// The instance id of the first adapter whose device path (or the instance
/// id itself) equals `device_id`, ignoring ASCII case.
pub fn match_adapter<I>(entries: I, device_id: &str) -> Option<String>
where
  I: IntoIterator<Item = AdapterEntry>,
{
  entries
    .into_iter()
    .find(|entry| {
      entry.device_instance_id.as_deref().map_or(false, |path| path.eq_ignore_ascii_case(device_id))
        || guid_eq(&entry.instance_id, device_id)
    })
    .map(|entry| entry.instance_id)
}

/// Compare two GUID strings, ignoring braces and ASCII case.
pub fn guid_eq(a: &str, b: &str) -> bool {
  let strip = |s: &str| s.trim().trim_start_matches('{').trim_end_matches('}').to_ascii_lowercase();
  strip(a) == strip(b)
}

/// Maps a device id to its adapter instance id.
pub trait AdapterRegistry {
  /// `Ok(None)` when no adapter key matches; `Err` when the keys can't be read.
  fn instance_id(&self, device_id: &str) -> Result<Option<String>, Error>;
}

/// Read access to the connections known to the sharing manager.
pub trait SharingInspector {
  type Connection;

  fn connections(&self) -> Result<Vec<Self::Connection>, Error>;
  fn connection_guid(&self, connection: &Self::Connection) -> Result<String, Error>;
  fn sharing_enabled(&self, connection: &Self::Connection) -> Result<bool, Error>;
}

/// Fail with `SharedConnection` if the connection of `device_id` has ICS
/// enabled. A device with no adapter key or no matching connection passes.
pub fn ensure_not_shared<R, S>(registry: &R, inspector: &S, device_id: &str) -> Result<(), Error>
where
  R: AdapterRegistry + ?Sized,
  S: SharingInspector + ?Sized,
{
  let instance_id = match registry.instance_id(device_id)? {
    Some(instance_id) => instance_id,
    None => {
      log::debug!("no adapter key matches {}; nothing to guard", device_id);
      return Ok(());
    }
  };
  log::debug!("device {} has instance id {}", device_id, instance_id);

  for connection in inspector.connections()? {
    let guid = match inspector.connection_guid(&connection) {
      Ok(guid) => guid,
      Err(e) => {
        log::debug!("skipping connection without readable GUID: {}", e);
        continue;
      }
    };
    if !guid_eq(&guid, &instance_id) {
      continue;
    }

    if inspector.sharing_enabled(&connection)? {
      log::warn!("connection {} of {} has sharing enabled", guid, device_id);
      return Err(Error::SharedConnection(device_id.to_string()));
    }
    return Ok(());
  }

  log::debug!("no connection matches {}; nothing to guard", instance_id);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  struct Registry(Vec<AdapterEntry>);

  impl AdapterRegistry for Registry {
    fn instance_id(&self, device_id: &str) -> Result<Option<String>, Error> {
      Ok(match_adapter(self.0.clone(), device_id))
    }
  }

  struct UnreadableRegistry;

  impl AdapterRegistry for UnreadableRegistry {
    fn instance_id(&self, _device_id: &str) -> Result<Option<String>, Error> {
      Err(Error::Sharing("access denied".into()))
    }
  }

  struct Connections {
    list: Vec<(Option<&'static str>, bool)>,
    inspected: Cell<usize>,
  }

  impl SharingInspector for Connections {
    type Connection = usize;

    fn connections(&self) -> Result<Vec<usize>, Error> {
      Ok((0..self.list.len()).collect())
    }

    fn connection_guid(&self, connection: &usize) -> Result<String, Error> {
      self.list[*connection].0.map(str::to_string).ok_or_else(|| Error::Sharing("no props".into()))
    }

    fn sharing_enabled(&self, connection: &usize) -> Result<bool, Error> {
      self.inspected.set(self.inspected.get() + 1);
      Ok(self.list[*connection].1)
    }
  }

  fn registry() -> Registry {
    Registry(vec![
      AdapterEntry { instance_id: "{AAAA0000-0000-0000-0000-000000000001}".into(), device_instance_id: Some("PCI\\VEN_8086&DEV_100E\\1".into()) },
      AdapterEntry { instance_id: "{BBBB0000-0000-0000-0000-000000000002}".into(), device_instance_id: Some("ROOT\\NET\\0000".into()) },
    ])
  }

  fn connections(list: Vec<(Option<&'static str>, bool)>) -> Connections {
    Connections { list, inspected: Cell::new(0) }
  }

  #[test]
  fn guard_policy_selects_actions() {
    assert!(IcsGuard::Bind.applies_to(BindAction::Bind));
    assert!(!IcsGuard::Bind.applies_to(BindAction::Unbind));
    assert!(IcsGuard::Always.applies_to(BindAction::Unbind));
    assert!(!IcsGuard::Off.applies_to(BindAction::Bind));
  }

  #[test]
  fn adapters_match_by_device_path_or_guid() {
    assert_eq!(match_adapter(registry().0, "root\\net\\0000").as_deref(), Some("{BBBB0000-0000-0000-0000-000000000002}"));
    assert_eq!(match_adapter(registry().0, "aaaa0000-0000-0000-0000-000000000001").as_deref(), Some("{AAAA0000-0000-0000-0000-000000000001}"));
    assert_eq!(match_adapter(registry().0, "ROOT\\NET\\0001"), None);
  }

  #[test]
  fn shared_connection_is_refused() {
    let inspector = connections(vec![
      (Some("{aaaa0000-0000-0000-0000-000000000001}"), false),
      (Some("{bbbb0000-0000-0000-0000-000000000002}"), true),
    ]);
    let err = ensure_not_shared(&registry(), &inspector, "ROOT\\NET\\0000").unwrap_err();
    assert!(matches!(err, Error::SharedConnection(_)));
    assert_eq!(err.exit_code(), -2);
    assert_eq!(inspector.inspected.get(), 1);
  }

  #[test]
  fn unshared_connection_passes() {
    let inspector = connections(vec![(Some("{BBBB0000-0000-0000-0000-000000000002}"), false)]);
    assert!(ensure_not_shared(&registry(), &inspector, "ROOT\\NET\\0000").is_ok());
  }

  #[test]
  fn unreadable_connections_are_skipped() {
    let inspector = connections(vec![(None, true), (Some("{BBBB0000-0000-0000-0000-000000000002}"), true)]);
    assert!(matches!(ensure_not_shared(&registry(), &inspector, "ROOT\\NET\\0000"), Err(Error::SharedConnection(_))));
  }

  #[test]
  fn device_without_connection_passes() {
    let inspector = connections(vec![(Some("{CCCC0000-0000-0000-0000-000000000003}"), true)]);
    assert!(ensure_not_shared(&registry(), &inspector, "ROOT\\NET\\0000").is_ok());
    assert_eq!(inspector.inspected.get(), 0);
  }

  #[test]
  fn device_without_adapter_key_passes() {
    let inspector = connections(vec![(Some("{BBBB0000-0000-0000-0000-000000000002}"), true)]);
    assert!(ensure_not_shared(&registry(), &inspector, "ROOT\\NET\\0009").is_ok());
    assert_eq!(inspector.inspected.get(), 0);
  }

  #[test]
  fn unreadable_registry_exits_with_minus_one() {
    let inspector = connections(Vec::new());
    let err = ensure_not_shared(&UnreadableRegistry, &inspector, "ROOT\\NET\\0000").unwrap_err();
    assert_eq!(err.exit_code(), -1);
  }
}
