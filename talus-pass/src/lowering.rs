//! Canonicalizing lowering passes that run right before register
//! allocation: every distinct literal and every parameter ends up loaded
//! exactly once, at the top of the entry block.

use std::collections::HashMap;
use talus_ast::SourceRange;
use talus_ir::{Function, Inst, InstKind, LiteralId, TypeSet, Value};

use crate::FunctionPass;

/// Hoists every reference to a given parameter index to one canonical
/// `LoadParam` at the top of the entry block.
pub struct LoadParameters;

impl FunctionPass for LoadParameters {
    fn name(&self) -> &'static str {
        "load_parameters"
    }

    fn run_on_function(&mut self, func: &mut Function) -> bool {
        let Some(entry) = func.entry_block() else {
            return false;
        };
        let mut changed = false;
        // `prepend_inst` always inserts at the very front of the block, so
        // processing indices in descending order leaves the canonical
        // loads in ascending order at the top of the entry block.
        for index in (0..func.param_count).rev() {
            let existing: Vec<Inst> = all_insts(func)
                .into_iter()
                .filter(|&i| matches!(func.insts[i].kind, InstKind::LoadParam(p) if p == index))
                .collect();
            if existing.is_empty() {
                continue;
            }
            let canonical = func.prepend_inst(entry, InstKind::LoadParam(index), TypeSet::ANY, SourceRange::default());
            for inst in existing {
                func.replace_all_uses(Value::from(inst), Value::from(canonical));
                func.erase_inst(inst);
            }
            changed = true;
        }
        changed
    }
}

/// Hoists every reference to a given constant to one canonical `LoadConst`
/// at the top of the entry block, deduplicated by literal identity.
pub struct LoadConstants;

impl FunctionPass for LoadConstants {
    fn name(&self) -> &'static str {
        "load_constants"
    }

    fn run_on_function(&mut self, func: &mut Function) -> bool {
        let Some(entry) = func.entry_block() else {
            return false;
        };

        let mut order: Vec<LiteralId> = Vec::new();
        let mut groups: HashMap<LiteralId, Vec<Inst>> = HashMap::new();
        for inst in all_insts(func) {
            let InstKind::LoadConst(id) = func.insts[inst].kind else {
                continue;
            };
            groups.entry(id).or_insert_with(|| {
                order.push(id);
                Vec::new()
            });
            groups.get_mut(&id).unwrap().push(inst);
        }

        let mut changed = false;
        for id in order {
            let insts = &groups[&id];
            let ty = func.insts[insts[0]].ty;
            let canonical = func.prepend_inst(entry, InstKind::LoadConst(id), ty, SourceRange::default());
            for &inst in insts {
                func.replace_all_uses(Value::from(inst), Value::from(canonical));
                func.erase_inst(inst);
            }
            changed = true;
        }
        changed
    }
}

fn all_insts(func: &Function) -> Vec<Inst> {
    func.block_order.iter().flat_map(|&b| func.blocks[b].insts.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ir::{Literal, Operand};
    use talus_support::{Arena, StringTable};

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 2, TypeSet::ANY)
    }

    #[test]
    fn load_parameters_consolidates_repeated_reads() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let a = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        let b = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(
            block,
            InstKind::BinaryOp {
                op: talus_ir::BinOp::Add,
                lhs: Operand::new_unlinked(Value::from(a)),
                rhs: Operand::new_unlinked(Value::from(b)),
            },
            TypeSet::ANY,
            SourceRange::default(),
        );
        func.append_inst(block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        LoadParameters.run_on_function(&mut func);
        let loads: Vec<_> = func.blocks[block]
            .insts
            .iter()
            .filter(|&&i| matches!(func.insts[i].kind, InstKind::LoadParam(0)))
            .collect();
        assert_eq!(loads.len(), 1);

        let errors = talus_ir::verify_function(&func);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn load_constants_deduplicates_and_hoists_to_entry() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let mut module_literals = talus_ir::LiteralPool::default();
        let id = module_literals.intern(Literal::Number(3.0));

        let entry = func.make_block();
        let other = func.make_block();
        func.append_inst(entry, InstKind::Branch(other), TypeSet::ANY, SourceRange::default());
        let first = func.append_inst(other, InstKind::LoadConst(id), TypeSet::NUMBER, SourceRange::default());
        let second = func.append_inst(other, InstKind::LoadConst(id), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(
            other,
            InstKind::BinaryOp {
                op: talus_ir::BinOp::Add,
                lhs: Operand::new_unlinked(Value::from(first)),
                rhs: Operand::new_unlinked(Value::from(second)),
            },
            TypeSet::ANY,
            SourceRange::default(),
        );
        func.append_inst(other, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        LoadConstants.run_on_function(&mut func);
        let entry_loads: Vec<_> =
            func.blocks[entry].insts.iter().filter(|&&i| matches!(func.insts[i].kind, InstKind::LoadConst(_))).collect();
        assert_eq!(entry_loads.len(), 1);
        assert!(!func.blocks[other].insts.iter().any(|&i| matches!(func.insts[i].kind, InstKind::LoadConst(_))));

        let errors = talus_ir::verify_function(&func);
        assert!(errors.is_empty(), "{errors:?}");
    }
}
