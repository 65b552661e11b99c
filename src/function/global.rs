//! Process-wide table of named functions

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::any::{Any, AnyView};
use crate::error::{Error, Result};
use crate::logging;

use super::{Function, TypedFunction};

static GLOBAL_FUNCTIONS: Lazy<DashMap<String, Function>> = Lazy::new(DashMap::new);

/// Register `function` under `name`
///
/// RuntimeError when the name is taken and `can_override` is false.
pub fn register_global(name: &str, function: Function, can_override: bool) -> Result<()> {
    match GLOBAL_FUNCTIONS.entry(name.to_string()) {
        Entry::Occupied(mut entry) => {
            if !can_override {
                return Err(Error::runtime_error(format!(
                    "Global Function `{}` is already registered",
                    name
                )));
            }
            entry.insert(function);
            logging::log_function_registered(name, true);
        }
        Entry::Vacant(entry) => {
            entry.insert(function);
            logging::log_function_registered(name, false);
        }
    }
    Ok(())
}

pub fn get_global(name: &str) -> Option<Function> {
    GLOBAL_FUNCTIONS.get(name).map(|entry| entry.value().clone())
}

/// Remove a registration, returning whether it existed
pub fn remove_global(name: &str) -> bool {
    GLOBAL_FUNCTIONS.remove(name).is_some()
}

/// Registered names in lexical order
pub fn list_global_names() -> Vec<String> {
    let mut names: Vec<String> = GLOBAL_FUNCTIONS
        .iter()
        .map(|entry| entry.key().clone())
        .collect();
    names.sort();
    names
}

/// Builder for a global registration
///
/// ```ignore
/// GlobalDef::new("math.add").typed(|a: i64, b: i64| a + b)?;
/// ```
pub struct GlobalDef {
    name: String,
    can_override: bool,
}

impl GlobalDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            can_override: false,
        }
    }

    pub fn allow_override(mut self, can_override: bool) -> Self {
        self.can_override = can_override;
        self
    }

    pub fn packed<F>(self, f: F) -> Result<Function>
    where
        F: Fn(&[AnyView<'_>]) -> Result<Any> + Send + Sync + 'static,
    {
        let function = Function::from_packed_named(self.name.clone(), f);
        self.function(function)
    }

    pub fn typed<M, F: TypedFunction<M>>(self, f: F) -> Result<Function> {
        let function = Function::from_typed(self.name.clone(), f);
        self.function(function)
    }

    pub fn function(self, function: Function) -> Result<Function> {
        register_global(&self.name, function.clone(), self.can_override)?;
        Ok(function)
    }
}
