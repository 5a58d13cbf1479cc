//! Resolves a `CondBranch` whose condition is a literal boolean constant
//! into an unconditional `Branch`, so `SimplifyCfg`'s reachability sweep
//! can prune the arm that condition can never take. Needs the module's
//! literal pool to read the constant's value, so it runs as a module
//! pass rather than alongside the other function passes.

use talus_ir::{InstKind, Literal, Module, TypeSet};

use crate::ModulePass;

pub struct FoldConstantBranches;

impl ModulePass for FoldConstantBranches {
    fn name(&self) -> &'static str {
        "fold_constant_branches"
    }

    fn run_on_module(&mut self, module: &mut Module) -> bool {
        let Module { functions, literal_pool, .. } = module;
        let mut changed = false;
        for func in functions.values_mut() {
            for block in func.block_order.clone() {
                let Some(&term) = func.blocks[block].insts.last() else { continue };
                let InstKind::CondBranch { cond, then_block, else_block } = func.insts[term].kind.clone() else { continue };
                let InstKind::LoadConst(lit) = func.insts[cond.value().inst()].kind.clone() else { continue };
                let Literal::Bool(taken) = literal_pool.get(lit) else { continue };

                let target = if taken { then_block } else { else_block };
                func.erase_inst(term);
                func.append_inst(block, InstKind::Branch(target), TypeSet::ANY, talus_ast::SourceRange::default());
                changed = true;
            }
        }
        changed
    }
}
