//! `ffi.Module` - a named bag of functions with an import list
//!
//! A module resolves a function name in this order:
//! 1. its own cache (functions added directly or resolved earlier)
//! 2. its symbol source, under `__tffi_<name>`
//! 3. its imports, depth first in import order
//!
//! `lookup_from_imports` additionally falls back to the global function
//! table and caches whatever it finds on the querying module.

use core::ffi::c_void;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::function::{self, Function, SafeCallType};
use crate::logging;
use crate::object::{make_object, Object};
use crate::registry::{type_index, StructuralKind};

use super::library::Library;
use super::symbols::{SymbolLookup, SystemLib, SYMBOL_PREFIX};

#[repr(C)]
pub struct ModuleNode {
    base: Object,
    name: String,
    symbols: Option<Arc<dyn SymbolLookup>>,
    imports: RwLock<Vec<Module>>,
    cache: Mutex<HashMap<String, Function>>,
}

crate::object_type! {
    ModuleNode: "ffi.Module" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::MODULE;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::UniqueInstance;
    }
}

crate::object_ref! {
    /// Reference to a module
    pub struct Module(ModuleNode) {
        const NULLABLE: bool = false;
    }
}

impl ModuleNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cached(&self, name: &str) -> Option<Function> {
        self.cache.lock().get(name).cloned()
    }

    /// Cache, then symbol source; imports are not consulted
    fn find_local(&self, name: &str) -> Option<Function> {
        if let Some(function) = self.cached(name) {
            return Some(function);
        }
        let symbols = self.symbols.as_ref()?;
        let symbol = format!("{}{}", SYMBOL_PREFIX, name);
        let address = symbols.get_symbol(&symbol);
        logging::log_symbol_lookup(&self.name, &symbol, address.is_some());
        let address = address?;

        // Exported entries follow the packed convention with a null handle
        let function = unsafe {
            let safe_call = core::mem::transmute::<*mut c_void, SafeCallType>(address);
            Function::from_extern_c_named(name, core::ptr::null_mut(), safe_call, None)
        };
        Some(
            self.cache
                .lock()
                .entry(name.to_string())
                .or_insert(function)
                .clone(),
        )
    }
}

impl Module {
    /// Module with no symbol source; functions are added with `add_function`
    pub fn new(name: impl Into<String>) -> Self {
        Self::make(name.into(), None)
    }

    pub fn with_symbols(name: impl Into<String>, symbols: Arc<dyn SymbolLookup>) -> Self {
        Self::make(name.into(), Some(symbols))
    }

    /// Module over a dynamically loaded library
    pub fn load(path: &str) -> Result<Self> {
        let library = Library::load(path)?;
        Ok(Self::with_symbols(path, Arc::new(library)))
    }

    /// Module over symbols published with `register_system_lib_symbol`
    pub fn system_lib() -> Self {
        Self::with_symbols("system-lib", Arc::new(SystemLib))
    }

    fn make(name: String, symbols: Option<Arc<dyn SymbolLookup>>) -> Self {
        Self::from_ptr(make_object(ModuleNode {
            base: Object::new(),
            name,
            symbols,
            imports: RwLock::new(Vec::new()),
            cache: Mutex::new(HashMap::new()),
        }))
    }

    pub fn add_function(&self, name: impl Into<String>, function: Function) {
        self.cache.lock().insert(name.into(), function);
    }

    pub fn import_module(&self, module: Module) {
        self.imports.write().push(module);
    }

    pub fn imports(&self) -> Vec<Module> {
        self.imports.read().clone()
    }

    /// Resolve `name` on this module and, when asked, its imports
    pub fn get_function(&self, name: &str, query_imports: bool) -> Option<Function> {
        if let Some(function) = self.find_local(name) {
            return Some(function);
        }
        if !query_imports {
            return None;
        }

        // Depth first over the import graph; shared imports are visited once
        let mut visited: HashSet<usize> = HashSet::new();
        visited.insert(self.as_object_ptr());
        let mut stack: Vec<Module> = self.imports().into_iter().rev().collect();
        while let Some(module) = stack.pop() {
            if !visited.insert(module.as_object_ptr()) {
                continue;
            }
            if let Some(function) = module.find_local(name) {
                return Some(function);
            }
            stack.extend(module.imports().into_iter().rev());
        }
        None
    }

    /// Resolve `name` through imports, then the global function table
    ///
    /// The result is cached on this module.
    pub fn lookup_from_imports(&self, name: &str) -> Result<Function> {
        let function = self
            .get_function(name, true)
            .or_else(|| function::get_global(name))
            .ok_or_else(|| {
                Error::runtime_error(format!(
                    "Cannot find function `{}` in the imported modules or global registry",
                    name
                ))
            })?;
        self.cache
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| function.clone());
        Ok(function)
    }

    fn as_object_ptr(&self) -> usize {
        self.0.as_ptr() as usize
    }
}
