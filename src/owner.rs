// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Resolving the user and group a TAP device is handed to.

use crate::log;
use crate::nix;

use nix::unistd::{geteuid, Group, User};

use crate::Error;

/// Parse an id the way `strtol(s, &end, 0)` does when it consumes the whole
/// string: `0x`/`0X` hex, leading `0` octal, decimal otherwise.
///
/// Negative values and `u32::MAX` are rejected: the TUN ioctls take a C int,
/// where both would read as `-1`, the kernel's "no owner" id.
pub fn parse_numeric_id(s: &str) -> Option<u32> {
  let s = s.strip_prefix('+').unwrap_or(s);
  let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
    (hex, 16)
  } else if s.len() > 1 && s.starts_with('0') {
    (&s[1..], 8)
  } else {
    (s, 10)
  };

  if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
    return None;
  }
  u32::from_str_radix(digits, radix).ok().filter(|id| *id != u32::MAX)
}

/// Name lookup first, numeric fallback second.
pub fn resolve_id<F>(name_or_id: &str, lookup: F) -> Option<u32>
where
  F: FnOnce(&str) -> Option<u32>,
{
  lookup(name_or_id).or_else(|| parse_numeric_id(name_or_id))
}

/// The uid for `name_or_id`, or the effective uid of the caller when there is none.
pub fn resolve_owner_with<F>(name_or_id: Option<&str>, lookup: F) -> Result<u32, Error>
where
  F: FnOnce(&str) -> Option<u32>,
{
  match name_or_id {
    None => Ok(geteuid().as_raw()),
    Some(name) => resolve_id(name, lookup).ok_or_else(|| Error::UnknownUser(name.to_string())),
  }
}

/// `resolve_owner_with` against the system user database.
pub fn resolve_owner(name_or_id: Option<&str>) -> Result<u32, Error> {
  resolve_owner_with(name_or_id, lookup_user)
}

/// The gid for `name_or_id`, against the system group database.
pub fn resolve_group(name_or_id: &str) -> Result<u32, Error> {
  resolve_id(name_or_id, lookup_group).ok_or_else(|| Error::UnknownGroup(name_or_id.to_string()))
}

fn lookup_user(name: &str) -> Option<u32> {
  match User::from_name(name) {
    Ok(user) => user.map(|user| user.uid.as_raw()),
    Err(e) => {
      log::debug!("user lookup for '{}' failed: {}", name, e);
      None
    }
  }
}

fn lookup_group(name: &str) -> Option<u32> {
  match Group::from_name(name) {
    Ok(group) => group.map(|group| group.gid.as_raw()),
    Err(e) => {
      log::debug!("group lookup for '{}' failed: {}", name, e);
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_users(_: &str) -> Option<u32> {
    None
  }

  #[test]
  fn numeric_ids_follow_strtol_base_detection() {
    assert_eq!(parse_numeric_id("1001"), Some(1001));
    assert_eq!(parse_numeric_id("0"), Some(0));
    assert_eq!(parse_numeric_id("0x3e9"), Some(1001));
    assert_eq!(parse_numeric_id("01751"), Some(1001));
    assert_eq!(parse_numeric_id("+7"), Some(7));
  }

  #[test]
  fn non_numeric_ids_are_rejected() {
    assert_eq!(parse_numeric_id(""), None);
    assert_eq!(parse_numeric_id("alice"), None);
    assert_eq!(parse_numeric_id("12abc"), None);
    assert_eq!(parse_numeric_id("-1"), None);
    assert_eq!(parse_numeric_id("0x"), None);
    assert_eq!(parse_numeric_id("089"), None);
    assert_eq!(parse_numeric_id("99999999999"), None);
    assert_eq!(parse_numeric_id("4294967295"), None);
    assert_eq!(parse_numeric_id("0xffffffff"), None);
    assert_eq!(parse_numeric_id("4294967294"), Some(4294967294));
  }

  #[test]
  fn missing_owner_defaults_to_effective_uid() {
    assert_eq!(resolve_owner_with(None, no_users).unwrap(), geteuid().as_raw());
  }

  #[test]
  fn username_wins_over_numeric_parse() {
    let uid = resolve_owner_with(Some("alice"), |name| if name == "alice" { Some(1001) } else { None }).unwrap();
    assert_eq!(uid, 1001);

    // a user literally named "42" is looked up before the number is used
    let uid = resolve_owner_with(Some("42"), |_| Some(5000)).unwrap();
    assert_eq!(uid, 5000);
  }

  #[test]
  fn numeric_owner_is_used_when_no_user_matches() {
    assert_eq!(resolve_owner_with(Some("1001"), no_users).unwrap(), 1001);
  }

  #[test]
  fn unknown_owner_is_an_error() {
    let err = resolve_owner_with(Some("nosuchuser"), no_users).unwrap_err();
    assert!(matches!(err, Error::UnknownUser(ref name) if name == "nosuchuser"));
  }

  #[test]
  fn root_resolves_from_the_system_database() {
    assert_eq!(resolve_owner(Some("root")).unwrap(), 0);
    assert_eq!(resolve_owner(Some("0")).unwrap(), 0);
    assert_eq!(resolve_group("0").unwrap(), 0);
  }
}
