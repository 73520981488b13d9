use std::collections::HashMap;

use crate::ir::types::RType;

/// An opaque, index-based identity for a register or an operation result.
///
/// Invariants:
/// - `ValueId`s are allocated by one `Environment` and are never reused,
///   even after the value they named is replaced and removed.
/// - A `ValueId` is only valid within the `FuncIr` whose environment
///   produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Registry of live values in one function body.
///
/// Declared types, debug names, and display ordinals live in side tables
/// keyed by `ValueId`, so mutating an attribute never invalidates a map
/// lookup elsewhere. The rewrite pass keeps this registry coherent: every
/// splice registers its new intermediates, migrates the replaced value's
/// debug entry to the stand-in result, and drops the stale entry.
#[derive(Debug, Default)]
pub struct Environment {
    next_value: u32,
    next_index: u32,
    types: HashMap<ValueId, RType>,
    names: HashMap<ValueId, String>,
    indexes: HashMap<ValueId, u32>,
    registers: Vec<ValueId>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, ty: RType) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        self.types.insert(id, ty);
        self.indexes.insert(id, self.next_index);
        self.next_index += 1;
        id
    }

    /// Declares a named register (function argument or local variable).
    pub fn new_register(&mut self, name: impl Into<String>, ty: RType) -> ValueId {
        let id = self.alloc(ty);
        self.names.insert(id, name.into());
        self.registers.push(id);
        id
    }

    /// Allocates an anonymous temporary (an operation result).
    pub fn new_temp(&mut self, ty: RType) -> ValueId {
        self.alloc(ty)
    }

    pub fn is_register(&self, v: ValueId) -> bool {
        self.registers.contains(&v)
    }

    /// All declared registers, in declaration order.
    pub fn registers(&self) -> &[ValueId] {
        &self.registers
    }

    /// Declared type, if the value is still live.
    pub fn ty(&self, v: ValueId) -> Option<RType> {
        self.types.get(&v).copied()
    }

    /// Mutates the declared type in place. The identity is unchanged.
    pub fn set_ty(&mut self, v: ValueId, ty: RType) {
        if let Some(slot) = self.types.get_mut(&v) {
            *slot = ty;
        }
    }

    pub fn name(&self, v: ValueId) -> Option<&str> {
        self.names.get(&v).map(String::as_str)
    }

    pub fn index(&self, v: ValueId) -> Option<u32> {
        self.indexes.get(&v).copied()
    }

    pub fn contains(&self, v: ValueId) -> bool {
        self.types.contains_key(&v)
    }

    /// Moves the debug name and ordinal of a replaced value onto the value
    /// that now stands in for its result, then removes the old entry.
    pub fn transfer(&mut self, old: ValueId, new: ValueId) {
        if let Some(name) = self.names.remove(&old) {
            self.names.insert(new, name);
        }
        if let Some(idx) = self.indexes.remove(&old) {
            self.indexes.insert(new, idx);
        }
        self.types.remove(&old);
    }

    /// Removes a stale entry outright (no stand-in value).
    pub fn remove(&mut self, v: ValueId) {
        self.types.remove(&v);
        self.names.remove(&v);
        self.indexes.remove(&v);
        self.registers.retain(|&r| r != v);
    }

    /// Iterates over every live value, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.types.keys().copied()
    }
}
