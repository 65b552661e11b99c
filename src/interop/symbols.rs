//! Symbol sources and the process-wide system-library table

use core::ffi::c_void;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::logging::debug;

/// Prefix under which modules export packed functions
pub const SYMBOL_PREFIX: &str = "__tffi_";

/// Anything that can resolve a symbol name to an address
pub trait SymbolLookup: Send + Sync {
    fn get_symbol(&self, name: &str) -> Option<*mut c_void>;

    /// Name used in logs
    fn describe(&self) -> String {
        "<symbols>".to_string()
    }
}

// Addresses are stored as integers so the table stays `Send + Sync`
static SYSTEM_LIB: Lazy<DashMap<String, usize>> = Lazy::new(DashMap::new);

/// Publish a symbol for modules linked into the process image
///
/// Re-registering a name replaces the previous address.
pub fn register_system_lib_symbol(name: &str, ptr: *mut c_void) {
    if let Some(previous) = SYSTEM_LIB.insert(name.to_string(), ptr as usize) {
        if previous != ptr as usize {
            debug!(target: "interop", symbol = name, "system-lib symbol replaced");
        }
    }
}

pub fn system_lib_symbol(name: &str) -> Option<*mut c_void> {
    SYSTEM_LIB.get(name).map(|entry| *entry.value() as *mut c_void)
}

/// Drop every system-lib registration
pub fn clear_system_lib() {
    SYSTEM_LIB.clear();
}

/// Symbol source backed by the system-lib table
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLib;

impl SymbolLookup for SystemLib {
    fn get_symbol(&self, name: &str) -> Option<*mut c_void> {
        system_lib_symbol(name)
    }

    fn describe(&self) -> String {
        "<system-lib>".to_string()
    }
}
