//! Typed handles into a `Function`'s and `Module`'s tables.

use std::fmt;
use talus_entity::{entity_impl, EntityRef, ReservedValue};

/// A basic block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ebb(u32);
entity_impl!(Ebb, "bb");

/// An instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A function-level constant pool entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiteralId(u32);
entity_impl!(LiteralId, "lit");

/// A module-level function.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(u32);
entity_impl!(FuncId, "func");

/// An SSA value. Every instruction defines at most one value, and a `Value`
/// is always identified with the `Inst` that defines it (there is no
/// separate value table): this mirrors the defining instruction directly
/// rather than adding an indirection that would need its own table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value(Inst);

impl Value {
    /// The instruction that defines this value.
    pub fn inst(self) -> Inst {
        self.0
    }
}

impl From<Inst> for Value {
    fn from(inst: Inst) -> Self {
        Value(inst)
    }
}

impl EntityRef for Value {
    fn new(index: usize) -> Self {
        Value(Inst::new(index))
    }

    fn index(self) -> usize {
        self.0.index()
    }
}

impl ReservedValue for Value {
    fn reserved_value() -> Self {
        Value(Inst::reserved_value())
    }

    fn is_reserved_value(&self) -> bool {
        self.0.is_reserved_value()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0.index())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        (self as &dyn fmt::Display).fmt(f)
    }
}
