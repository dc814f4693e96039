// -*- indent-tabs-mode: nil; tab-width: 2; -*-
// vim: set ts=&2 sw=2 et ai :

use std::ffi::c_void;
use std::marker::PhantomData;

use windows::core::PWSTR;
use windows::Win32::System::Com::{CoInitializeEx, CoTaskMemFree, CoUninitialize, COINIT_APARTMENTTHREADED};

use super::describe;
use crate::Error;

/// COM initialized on the current thread until dropped.
pub struct ComApartment {
  // CoUninitialize has to run on the initializing thread
  _thread_bound: PhantomData<*const ()>,
}

impl ComApartment {
  pub fn init() -> Result<Self, Error> {
    unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
      .ok()
      .map_err(|e| Error::NotifyObject(describe(&e)))?;
    Ok(ComApartment { _thread_bound: PhantomData })
  }
}

impl Drop for ComApartment {
  fn drop(&mut self) {
    unsafe { CoUninitialize() };
  }
}

/// A string allocated by a COM callee, freed with `CoTaskMemFree`.
pub struct CoTaskString(PWSTR);

impl CoTaskString {
  /// # Safety
  /// `raw` must be null or a string allocated with `CoTaskMemAlloc` that
  /// nobody else frees.
  pub unsafe fn from_raw(raw: PWSTR) -> Self {
    CoTaskString(raw)
  }

  pub fn is_null(&self) -> bool {
    self.0.is_null()
  }

  pub fn to_string_lossy(&self) -> String {
    if self.0.is_null() {
      return String::new();
    }
    unsafe { String::from_utf16_lossy(self.0.as_wide()) }
  }
}

impl Drop for CoTaskString {
  fn drop(&mut self) {
    if !self.0.is_null() {
      unsafe { CoTaskMemFree(Some(self.0.as_ptr() as *const c_void)) };
    }
  }
}
