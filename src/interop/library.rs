//! Dynamic library loading and symbol resolution
//!
//! Platform-agnostic wrapper around dlopen/LoadLibrary.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::ffi::CString;

use crate::error::{Error, Result};
use crate::logging::debug;

use super::symbols::SymbolLookup;

/// Handle to a dynamically loaded library
pub struct Library {
    handle: NonNull<c_void>,
    path: String,
}

impl Library {
    /// Load a library by name or path
    ///
    /// Bare names go through the platform search path.
    pub fn load(path: &str) -> Result<Self> {
        let handle = Self::open(path)?;
        debug!(target: "interop", path, "library loaded");
        Ok(Self {
            handle,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    #[cfg(unix)]
    fn open(path: &str) -> Result<NonNull<c_void>> {
        let cname = CString::new(path)
            .map_err(|_| Error::value_error(format!("Invalid library path `{}`", path)))?;

        unsafe {
            let handle = libc::dlopen(cname.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL);
            NonNull::new(handle).ok_or_else(|| {
                let err = libc::dlerror();
                let msg = if !err.is_null() {
                    std::ffi::CStr::from_ptr(err).to_string_lossy().into_owned()
                } else {
                    "Unknown error".into()
                };
                Error::runtime_error(format!("Failed to load library `{}`: {}", path, msg))
            })
        }
    }

    #[cfg(windows)]
    fn open(path: &str) -> Result<NonNull<c_void>> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::errhandlingapi::GetLastError;
        use winapi::um::libloaderapi::LoadLibraryW;

        let wide: Vec<u16> = OsStr::new(path).encode_wide().chain(Some(0)).collect();

        unsafe {
            let handle = LoadLibraryW(wide.as_ptr());
            NonNull::new(handle as *mut c_void).ok_or_else(|| {
                let code = GetLastError();
                Error::runtime_error(format!(
                    "Failed to load library `{}`: error code {}",
                    path, code
                ))
            })
        }
    }

    /// Address of `name`, or `None` when the library does not export it
    pub fn symbol(&self, name: &str) -> Option<*mut c_void> {
        let cname = CString::new(name).ok()?;
        let ptr = self.symbol_impl(&cname);
        (!ptr.is_null()).then_some(ptr)
    }

    #[cfg(unix)]
    fn symbol_impl(&self, name: &CString) -> *mut c_void {
        unsafe { libc::dlsym(self.handle.as_ptr(), name.as_ptr()) }
    }

    #[cfg(windows)]
    fn symbol_impl(&self, name: &CString) -> *mut c_void {
        use winapi::um::libloaderapi::GetProcAddress;
        unsafe { GetProcAddress(self.handle.as_ptr() as _, name.as_ptr()) as *mut c_void }
    }
}

impl Drop for Library {
    #[cfg(unix)]
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }
    }

    #[cfg(windows)]
    fn drop(&mut self) {
        use winapi::um::libloaderapi::FreeLibrary;
        unsafe {
            FreeLibrary(self.handle.as_ptr() as _);
        }
    }
}

// dlopen handles are process-global and dlsym is thread safe
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl SymbolLookup for Library {
    fn get_symbol(&self, name: &str) -> Option<*mut c_void> {
        self.symbol(name)
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

impl core::fmt::Debug for Library {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}
