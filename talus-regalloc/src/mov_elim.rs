//! Step 4.12: after assignment, fold away `Mov`s whose source can simply be
//! produced directly into the destination's register.
//!
//! Scanning each block forward, tracking the last instruction index that
//! (re)assigned and that read each register: a `Mov dst, src` is redundant
//! when `src` has no other reader, is defined earlier in the same block,
//! and nothing has touched `dst`'s register since before `src` was
//! assigned — so `src`'s producer can target `dst`'s register directly and
//! the `Mov` itself is deleted.

use std::collections::HashMap;
use talus_ir::{Function, InstKind, Value};

use crate::assign::RegisterAllocation;
use crate::numbering::Numbering;

pub fn eliminate(func: &mut Function, numbering: &Numbering, allocation: &RegisterAllocation) {
    let blocks = func.block_order.clone();
    for block in blocks {
        let mut last_assignment: HashMap<u32, i64> = HashMap::new();
        let mut last_use: HashMap<u32, i64> = HashMap::new();
        let mut to_fold: Vec<(talus_ir::Inst, Value, Value)> = Vec::new();

        for &inst in &func.blocks[block].insts {
            let n = numbering.index(inst) as i64;
            let kind = func.insts[inst].kind.clone();

            if let InstKind::Mov(operand) = &kind {
                let src = operand.value();
                let dst = Value::from(inst);
                let same_block = func.insts[src.inst()].block == block;
                let single_user = func.use_count(src) == 1;
                if same_block && single_user {
                    let dst_reg = allocation.register_of(dst);
                    let src_reg = allocation.register_of(src);
                    let dst_last_assign = last_assignment.get(&dst_reg).copied().unwrap_or(-1);
                    let src_last_assign = last_assignment.get(&src_reg).copied().unwrap_or(-1);
                    let dst_last_use = last_use.get(&dst_reg).copied().unwrap_or(-1);
                    if dst_last_assign < src_last_assign && dst_last_use <= src_last_assign {
                        to_fold.push((inst, dst, src));
                    }
                }
            }

            for operand in kind.operands() {
                last_use.insert(allocation.register_of(operand.value()), n);
            }
            if kind.defines_value() {
                last_assignment.insert(allocation.register_of(Value::from(inst)), n);
            }
        }

        for (mov, dst, src) in to_fold {
            func.replace_all_uses(dst, src);
            func.erase_inst(mov);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::SourceRange;
    use talus_ir::{ControlFlowGraph, DominatorTree, Operand, TypeSet};
    use talus_support::{Arena, StringTable};

    use crate::coalesce::coalesce;
    use crate::liveness::Liveness;

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn a_mov_with_a_single_reader_and_no_intervening_clobber_is_folded_away() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let a = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        let mov = func.append_inst(block, InstKind::Mov(Operand::new_unlinked(Value::from(a))), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(block, InstKind::Return(Some(Operand::new_unlinked(Value::from(mov)))), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut domtree = DominatorTree::new();
        domtree.compute(&func, &cfg);
        let numbering = Numbering::compute(&func, &domtree);
        let liveness = Liveness::compute(&func, &cfg);
        let intervals = crate::interval::build(&func, &numbering, &liveness);
        let coalescing = coalesce(&func, &intervals);
        let allocation = crate::assign::assign(&func, &numbering, &intervals, coalescing);

        eliminate(&mut func, &numbering, &allocation);
        assert!(!func.blocks[block].insts.contains(&mov));

        let errors = talus_ir::verify_function(&func);
        assert!(errors.is_empty(), "{errors:?}");
    }
}
