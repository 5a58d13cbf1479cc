//! Dead code elimination.

use talus_ir::{ControlFlowGraph, DominatorTree, Function, Value};

use crate::FunctionPass;

/// An instruction is dead iff it defines a value with no remaining users,
/// writes no observable state, and is not a terminator. Removing one dead
/// instruction can make its own operands dead in turn, so the sweep
/// iterates to a fixed point.
pub struct Dce;

impl FunctionPass for Dce {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run_on_function(&mut self, func: &mut Function) -> bool {
        let mut cfg = ControlFlowGraph::new();
        cfg.compute(func);
        let mut domtree = DominatorTree::new();
        domtree.compute(func, &cfg);
        // Reachable-block order, leaf-first as `DominatorTree` builds it;
        // reversed gives the reverse postorder sweep order.
        let order: Vec<_> = domtree.cfg_postorder().iter().rev().copied().collect();

        let mut changed = false;
        loop {
            let mut removed_any = false;
            for &block in &order {
                for inst in func.blocks[block].insts.clone() {
                    let kind = &func.insts[inst].kind;
                    if kind.is_terminator() || kind.has_side_effects() || !kind.defines_value() {
                        continue;
                    }
                    if func.use_count(Value::from(inst)) == 0 {
                        func.erase_inst(inst);
                        removed_any = true;
                    }
                }
            }
            if !removed_any {
                break;
            }
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::SourceRange;
    use talus_ir::{InstKind, Operand, TypeSet};
    use talus_support::{Arena, StringTable};

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn removes_an_unused_computation() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let a = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let changed = Dce.run_on_function(&mut func);
        assert!(changed);
        assert!(!func.blocks[block].insts.contains(&a));
    }

    #[test]
    fn a_store_is_never_removed_even_with_no_reader() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let slot = talus_ir::Value::from(func.append_inst(block, InstKind::AllocStack, TypeSet::ANY, SourceRange::default()));
        let v = talus_ir::Value::from(func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default()));
        let store = func.append_inst(
            block,
            InstKind::StoreStack { slot: Operand::new_unlinked(slot), value: Operand::new_unlinked(v) },
            TypeSet::ANY,
            SourceRange::default(),
        );
        func.append_inst(block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        Dce.run_on_function(&mut func);
        assert!(func.blocks[block].insts.contains(&store));
    }

    #[test]
    fn dead_chains_cascade_in_one_run() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let a = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        let neg = func.append_inst(
            block,
            InstKind::UnaryOp { op: talus_ir::UnOp::Neg, operand: Operand::new_unlinked(talus_ir::Value::from(a)) },
            TypeSet::NUMBER,
            SourceRange::default(),
        );
        func.append_inst(block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        Dce.run_on_function(&mut func);
        assert!(!func.blocks[block].insts.contains(&a));
        assert!(!func.blocks[block].insts.contains(&neg));
    }
}
