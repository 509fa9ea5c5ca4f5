//! Host netlist model.

mod attrs;
mod cell;
mod cell_kind;
mod error;
mod ids;
mod module;
mod sig;
mod sigmap;

pub use attrs::{AttrMap, AttrValue};
pub use cell::Cell;
pub use cell_kind::{CellKind, PortDirection};
pub use error::NetlistError;
pub use ids::{CellId, WireId};
pub use module::{Module, Wire};
pub use sig::{SigBit, SigSpec};
pub use sigmap::SigMap;

use indexmap::IndexMap;

/// A collection of modules keyed by name, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Design {
    /// Modules by name.
    modules: IndexMap<String, Module>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if a module with the same name exists.
    pub fn add_module(&mut self, module: Module) -> Result<(), NetlistError> {
        if self.modules.contains_key(module.name()) {
            return Err(NetlistError::duplicate("module", module.name()));
        }
        self.modules.insert(module.name().to_owned(), module);
        Ok(())
    }

    /// Looks up a module by name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Looks up a module by name for mutation.
    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    /// Iterates over all modules.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Iterates mutably over all modules.
    pub fn modules_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.modules.values_mut()
    }

    /// Module names in insertion order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// The top module: the one carrying a `top` attribute, or the only module.
    pub fn top(&self) -> Option<&Module> {
        self.modules
            .values()
            .find(|m| m.attributes.is_set("top"))
            .or_else(|| (self.modules.len() == 1).then(|| self.modules.values().next()).flatten())
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the design holds no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl From<Module> for Design {
    fn from(module: Module) -> Self {
        let mut modules = IndexMap::new();
        modules.insert(module.name().to_owned(), module);
        Self { modules }
    }
}
