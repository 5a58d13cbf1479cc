//! Sequential instruction numbering in reverse postorder — the ordering
//! every later step (liveness, intervals, assignment) is keyed on.

use std::collections::HashMap;
use talus_ir::{DominatorTree, Ebb, Function, Inst};

#[derive(Clone, Debug, Default)]
pub struct Numbering {
    index: HashMap<Inst, u32>,
    order: Vec<Inst>,
    block_end: HashMap<Ebb, u32>,
}

impl Numbering {
    /// Walk `func`'s reachable blocks in reverse postorder (as `domtree`
    /// built it) and assign each instruction the next sequential index.
    pub fn compute(func: &Function, domtree: &DominatorTree) -> Self {
        let mut numbering = Numbering::default();
        for &block in domtree.cfg_postorder().iter().rev() {
            for &inst in &func.blocks[block].insts {
                let n = numbering.order.len() as u32;
                numbering.index.insert(inst, n);
                numbering.order.push(inst);
            }
            if let Some(&last) = numbering.order.last() {
                numbering.block_end.insert(block, numbering.index[&last]);
            }
        }
        numbering
    }

    pub fn index(&self, inst: Inst) -> u32 {
        self.index[&inst]
    }

    /// The numbering of `block`'s terminator: the last index used inside it.
    pub fn block_end(&self, block: Ebb) -> u32 {
        self.block_end[&block]
    }

    pub fn order(&self) -> &[Inst] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::SourceRange;
    use talus_ir::{ControlFlowGraph, InstKind, TypeSet};
    use talus_support::{Arena, StringTable};

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn numbers_instructions_in_reverse_postorder() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let entry = func.make_block();
        let exit = func.make_block();
        let a = func.append_inst(entry, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(entry, InstKind::Branch(exit), TypeSet::ANY, SourceRange::default());
        let ret = func.append_inst(exit, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut domtree = DominatorTree::new();
        domtree.compute(&func, &cfg);

        let numbering = Numbering::compute(&func, &domtree);
        assert_eq!(numbering.index(a), 0);
        assert_eq!(numbering.index(ret), 2);
        assert_eq!(numbering.block_end(entry), 1);
        assert_eq!(numbering.block_end(exit), 2);
        assert_eq!(numbering.order().len(), 3);
    }
}
