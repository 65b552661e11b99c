//! Interoperability - modules, symbol sources and host hooks
//!
//! Architecture:
//! - `symbols.rs` - `SymbolLookup` trait and the system-lib symbol table
//! - `library.rs` - Dynamic library loading (dlopen/LoadLibrary)
//! - `module.rs` - `ffi.Module` with import-table lookup
//! - `env.rs` - signal check and interpreter-lock hooks from an embedding host

mod env;
mod library;
mod module;
mod symbols;

pub use env::{
    check_signals, check_signals_status, clear_context_symbols, has_context_symbol,
    register_context_symbol, GilGuard, CHECK_SIGNALS, GIL_ACQUIRE, GIL_RELEASE,
};
pub use library::Library;
pub use module::{Module, ModuleNode};
pub use symbols::{
    clear_system_lib, register_system_lib_symbol, system_lib_symbol, SymbolLookup, SystemLib,
    SYMBOL_PREFIX,
};
