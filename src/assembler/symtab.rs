//! The symbol table maps names to their kind, binding, and
//! section-relative address. Names are unique across the whole unit
//! regardless of kind, so a label and a `.static` variable may never
//! share a name.

use std::collections::BTreeMap;

/// Which section a symbol lives in.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    Code,
    Data,
}

impl SymbolKind {
    /// Wire code used in the serialized symbol table.
    pub fn to_u8(self) -> u8 {
        match self {
            SymbolKind::Code => 0,
            SymbolKind::Data => 1,
        }
    }
}

/// Whether a symbol is unit-private or visible to the linker.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Binding {
    Local,
    Global,
}

impl Binding {
    pub fn to_u8(self) -> u8 {
        match self {
            Binding::Local => 0,
            Binding::Global => 1,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub binding: Binding,
    /// Offset within the symbol's own section: a 0-based instruction
    /// index for Code symbols, a byte offset for Data symbols.
    pub address: u32,
}

/// The one canonical symbol store. Owned exclusively by the
/// `AssemblyUnit`; every lookup goes through here. Backed by a BTreeMap
/// so serialization order is deterministic.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SymbolTable {
    table: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            table: BTreeMap::new(),
        }
    }

    /// Register a new LOCAL symbol. Returns false (and leaves the table
    /// untouched) if the name is already taken by a symbol of any kind.
    pub fn define(&mut self, name: &str, kind: SymbolKind, address: u32) -> bool {
        if self.table.contains_key(name) {
            return false;
        }
        self.table.insert(
            name.to_owned(),
            Symbol {
                name: name.to_owned(),
                kind,
                binding: Binding::Local,
                address,
            },
        );
        true
    }

    /// Upgrade an existing symbol's binding to GLOBAL. The address is
    /// never changed. Returns false if the name is not defined.
    pub fn promote_global(&mut self, name: &str) -> bool {
        match self.table.get_mut(name) {
            Some(sym) => {
                sym.binding = Binding::Global;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.table.get(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Symbols in serialization order (sorted by name).
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.table.values()
    }
}
