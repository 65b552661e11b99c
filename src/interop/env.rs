//! Host-environment hooks
//!
//! An embedding runtime hands the process a few callbacks by name:
//! - `env.check_signals`: `extern "C" fn() -> i32`, nonzero when the host
//!   wants the current native call aborted (the host error is already set)
//! - `env.gil_acquire`: `extern "C" fn() -> *mut c_void`, returns a state token
//! - `env.gil_release`: `extern "C" fn(*mut c_void)`, takes that token back
//!
//! Missing hooks are not an error; the corresponding feature is a no-op.

use core::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{take_raised, Error, Result};
use crate::logging::debug;

pub const CHECK_SIGNALS: &str = "env.check_signals";
pub const GIL_ACQUIRE: &str = "env.gil_acquire";
pub const GIL_RELEASE: &str = "env.gil_release";

type CheckSignalsFn = unsafe extern "C" fn() -> i32;
type GilAcquireFn = unsafe extern "C" fn() -> *mut c_void;
type GilReleaseFn = unsafe extern "C" fn(*mut c_void);

// Zero means unset
static CHECK_SIGNALS_HOOK: AtomicUsize = AtomicUsize::new(0);
static GIL_ACQUIRE_HOOK: AtomicUsize = AtomicUsize::new(0);
static GIL_RELEASE_HOOK: AtomicUsize = AtomicUsize::new(0);

fn slot(name: &str) -> Option<&'static AtomicUsize> {
    match name {
        CHECK_SIGNALS => Some(&CHECK_SIGNALS_HOOK),
        GIL_ACQUIRE => Some(&GIL_ACQUIRE_HOOK),
        GIL_RELEASE => Some(&GIL_RELEASE_HOOK),
        _ => None,
    }
}

/// Install (or, with a null pointer, remove) a context symbol
///
/// # Safety
/// A non-null `symbol` must be a function with the signature documented
/// for `name`, valid for as long as it stays registered.
pub unsafe fn register_context_symbol(name: &str, symbol: *mut c_void) -> Result<()> {
    let slot = slot(name)
        .ok_or_else(|| Error::value_error(format!("Unknown context symbol `{}`", name)))?;
    slot.store(symbol as usize, Ordering::Release);
    debug!(target: "interop", symbol = name, installed = !symbol.is_null(), "context symbol");
    Ok(())
}

pub fn has_context_symbol(name: &str) -> bool {
    slot(name).is_some_and(|slot| slot.load(Ordering::Acquire) != 0)
}

/// Remove every context symbol
pub fn clear_context_symbols() {
    for slot in [&CHECK_SIGNALS_HOOK, &GIL_ACQUIRE_HOOK, &GIL_RELEASE_HOOK] {
        slot.store(0, Ordering::Release);
    }
}

/// Raw status of the host signal check, 0 when no hook is installed
pub fn check_signals_status() -> i32 {
    let address = CHECK_SIGNALS_HOOK.load(Ordering::Acquire);
    if address == 0 {
        return 0;
    }
    let hook = unsafe { core::mem::transmute::<usize, CheckSignalsFn>(address) };
    unsafe { hook() }
}

/// Cooperative interrupt point for long native calls
pub fn check_signals() -> Result<()> {
    match check_signals_status() {
        0 => Ok(()),
        status => Err(take_raised().unwrap_or_else(|| {
            Error::runtime_error(format!(
                "Interrupted by the host environment (status {})",
                status
            ))
        })),
    }
}

/// Holds the host interpreter lock while alive
///
/// Acquiring without both hooks installed yields an inert guard.
pub struct GilGuard {
    state: Option<(*mut c_void, GilReleaseFn)>,
}

impl GilGuard {
    pub fn acquire() -> Self {
        let acquire = GIL_ACQUIRE_HOOK.load(Ordering::Acquire);
        let release = GIL_RELEASE_HOOK.load(Ordering::Acquire);
        if acquire == 0 || release == 0 {
            return Self { state: None };
        }
        unsafe {
            let acquire = core::mem::transmute::<usize, GilAcquireFn>(acquire);
            let release = core::mem::transmute::<usize, GilReleaseFn>(release);
            Self {
                state: Some((acquire(), release)),
            }
        }
    }

    pub fn is_held(&self) -> bool {
        self.state.is_some()
    }
}

impl Drop for GilGuard {
    fn drop(&mut self) {
        if let Some((token, release)) = self.state.take() {
            unsafe { release(token) };
        }
    }
}
