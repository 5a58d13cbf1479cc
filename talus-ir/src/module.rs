//! A compilation unit: one or more functions sharing a string table and
//! constant pool.

use crate::entities::{FuncId, LiteralId};
use crate::function::Function;
use crate::literal::{Literal, LiteralKey};
use std::collections::HashMap;
use talus_entity::{EntityRef, PrimaryMap};
use talus_support::{Arena, StringTable};

/// The module-wide constant pool. Split out from `Module` as its own field
/// so that callers building one function's body can hold a mutable
/// borrow of `Module::functions[id]` and intern literals at the same time
/// — the two borrows touch disjoint fields of `Module`.
#[derive(Default)]
pub struct LiteralPool<'a> {
    literals: Vec<Literal<'a>>,
    index: HashMap<LiteralKey, LiteralId>,
}

impl<'a> LiteralPool<'a> {
    /// Intern `literal`, deduplicating by content so repeated constants
    /// anywhere in the module share one pool entry.
    pub fn intern(&mut self, literal: Literal<'a>) -> LiteralId {
        let key = literal.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = LiteralId::new(self.literals.len());
        self.literals.push(literal);
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, id: LiteralId) -> Literal<'a> {
        self.literals[id.index()]
    }
}

/// Everything produced by IR-gen for one compiled source unit.
pub struct Module<'a> {
    pub arena: &'a Arena,
    pub strings: StringTable<'a>,
    pub functions: PrimaryMap<FuncId, Function<'a>>,
    pub literal_pool: LiteralPool<'a>,
}

impl<'a> Module<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            strings: StringTable::new(arena),
            functions: PrimaryMap::new(),
            literal_pool: LiteralPool::default(),
        }
    }

    /// Declare a new, empty function and return its handle.
    pub fn declare_function(&mut self, f: Function<'a>) -> FuncId {
        self.functions.push(f)
    }

    pub fn intern_literal(&mut self, literal: Literal<'a>) -> LiteralId {
        self.literal_pool.intern(literal)
    }

    pub fn literal(&self, id: LiteralId) -> Literal<'a> {
        self.literal_pool.get(id)
    }
}
