// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

//! Persistent TAP devices through the `/dev/net/tun` ioctls.
//!
//! The control device is opened per call and closed when the `TunControl`
//! is dropped. A failing step aborts the sequence; steps already applied are
//! reported in the error and left in place. A TAP that `TUNSETIFF` creates is
//! not persistent yet, so it goes away with the descriptor; an existing
//! persistent device keeps whatever owner or group was already set.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use crate::libc;
use crate::log;
use crate::nix;

use nix::sys::ioctl::ioctl_num_type;

use crate::error::TapStep;
use crate::Error;

pub const TUNSETIFF: ioctl_num_type = nix::request_code_write!(b'T', 202, std::mem::size_of::<libc::c_int>());
pub const TUNSETPERSIST: ioctl_num_type = nix::request_code_write!(b'T', 203, std::mem::size_of::<libc::c_int>());
pub const TUNSETOWNER: ioctl_num_type = nix::request_code_write!(b'T', 204, std::mem::size_of::<libc::c_int>());
pub const TUNSETGROUP: ioctl_num_type = nix::request_code_write!(b'T', 206, std::mem::size_of::<libc::c_int>());

nix::ioctl_write_ptr_bad!(tun_set_iff, TUNSETIFF, libc::ifreq);
nix::ioctl_write_int_bad!(tun_set_persist, TUNSETPERSIST);
nix::ioctl_write_int_bad!(tun_set_owner, TUNSETOWNER);
nix::ioctl_write_int_bad!(tun_set_group, TUNSETGROUP);

fn invalid_name(ifname: &str, reason: &'static str) -> Error {
  Error::InvalidName { name: ifname.to_string(), reason }
}

pub fn ifname_to_cstring(ifname: &str) -> Result<CString, Error> {
  if ifname.len() >= libc::IFNAMSIZ || ifname.is_empty() {
    return Err(invalid_name(ifname, "interface name too long or short"));
  }

  if ifname.contains(|c: char| c == '/' || c.is_ascii_whitespace() || c == '\x0b') {
    return Err(invalid_name(ifname, "interface name contains an invalid character"));
  }

  CString::new(ifname).map_err(|_| invalid_name(ifname, "interface name contains a NUL byte"))
}

/// An `ifreq` asking for a TAP device without packet information framing.
fn tap_request(ifname: &CString) -> libc::ifreq {
  let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
  ifr.ifr_ifru.ifru_flags = (libc::IFF_TAP | libc::IFF_NO_PI) as libc::c_short;
  for (dst, src) in ifr.ifr_name.iter_mut().zip(ifname.as_bytes()) {
    *dst = *src as libc::c_char;
  }
  ifr
}

/// The control device, attached to one TAP interface.
pub struct TunControl {
  file: File,
  ifname: String,
  applied: Vec<TapStep>,
}

impl TunControl {
  /// Open `device` and attach it to `ifname` with `TUNSETIFF`.
  pub fn attach(device: &Path, ifname: &str) -> Result<Self, Error> {
    let name = ifname_to_cstring(ifname)?;
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .open(device)
      .map_err(|source| Error::TapOpen { path: device.to_path_buf(), source })?;

    let mut control = TunControl { file, ifname: ifname.to_string(), applied: Vec::new() };
    let ifr = tap_request(&name);
    control.apply(TapStep::Attach, |fd| unsafe { tun_set_iff(fd, &ifr) })?;
    Ok(control)
  }

  fn apply<F>(&mut self, step: TapStep, ioctl: F) -> Result<(), Error>
  where
    F: FnOnce(RawFd) -> nix::Result<libc::c_int>,
  {
    match ioctl(self.file.as_raw_fd()) {
      Ok(_) => {
        log::debug!("{} on '{}' done", step, self.ifname);
        self.applied.push(step);
        Ok(())
      }
      Err(errno) => {
        log::warn!("{} on '{}' failed after {:?}: {}", step, self.ifname, self.applied, errno);
        Err(Error::TapSetup {
          ifname: self.ifname.clone(),
          step,
          applied: self.applied.clone(),
          source: io::Error::from(errno),
        })
      }
    }
  }

  pub fn set_owner(&mut self, uid: u32) -> Result<(), Error> {
    self.apply(TapStep::Owner, |fd| unsafe { tun_set_owner(fd, uid as libc::c_int) })
  }

  pub fn set_group(&mut self, gid: u32) -> Result<(), Error> {
    self.apply(TapStep::Group, |fd| unsafe { tun_set_group(fd, gid as libc::c_int) })
  }

  pub fn set_persistent(&mut self, persistent: bool) -> Result<(), Error> {
    let step = if persistent { TapStep::Persist } else { TapStep::Unpersist };
    self.apply(step, |fd| unsafe { tun_set_persist(fd, persistent as libc::c_int) })
  }
}

/// Create (or take over) `ifname` as a persistent TAP owned by `uid`.
pub fn create_persistent(device: &Path, ifname: &str, uid: u32, gid: Option<u32>) -> Result<(), Error> {
  let mut control = TunControl::attach(device, ifname)?;
  control.set_owner(uid)?;
  if let Some(gid) = gid {
    control.set_group(gid)?;
  }
  control.set_persistent(true)
}

/// Clear the persistent flag of `ifname` so the kernel removes it.
pub fn clear_persistent(device: &Path, ifname: &str) -> Result<(), Error> {
  let mut control = TunControl::attach(device, ifname)?;
  control.set_persistent(false)
}
