//! The control flow graph derived from a function's terminators.

use crate::entities::Ebb;
use crate::function::Function;
use talus_entity::SecondaryMap;

#[derive(Clone, Debug, Default)]
struct CfgNode {
    predecessors: Vec<Ebb>,
    successors: Vec<Ebb>,
}

/// Predecessor/successor edges computed from a function's block terminators.
/// Rebuilt from scratch by `compute`; call `recompute_block` after editing a
/// single block's terminator rather than paying for a full rebuild.
#[derive(Clone, Debug, Default)]
pub struct ControlFlowGraph {
    data: SecondaryMap<Ebb, CfgNode>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every edge in the graph from `func`'s current terminators.
    pub fn compute(&mut self, func: &Function) {
        self.data.clear();
        for &block in &func.block_order {
            self.compute_block(func, block);
        }
    }

    /// Recompute `block`'s outgoing edges (and the matching incoming edges
    /// on its successors), leaving every other block's data untouched.
    pub fn recompute_block(&mut self, func: &Function, block: Ebb) {
        // Drop this block from every successor's predecessor list before
        // recomputing, in case a previously-recorded edge no longer exists.
        let stale_successors = self.data[block].successors.clone();
        for succ in stale_successors {
            self.data[succ].predecessors.retain(|&p| p != block);
        }
        self.data[block].successors.clear();
        self.compute_block(func, block);
    }

    fn compute_block(&mut self, func: &Function, block: Ebb) {
        let Some(&last) = func.blocks[block].insts.last() else {
            return;
        };
        for target in func.insts[last].kind.branch_targets() {
            self.add_edge(block, target);
        }
    }

    fn add_edge(&mut self, from: Ebb, to: Ebb) {
        self.data[from].successors.push(to);
        self.data[to].predecessors.push(from);
    }

    pub fn pred_iter(&self, block: Ebb) -> impl Iterator<Item = Ebb> + '_ {
        self.data[block].predecessors.iter().copied()
    }

    pub fn succ_iter(&self, block: Ebb) -> impl Iterator<Item = Ebb> + '_ {
        self.data[block].successors.iter().copied()
    }

    pub fn pred_count(&self, block: Ebb) -> usize {
        self.data[block].predecessors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{InstKind, Operand, SourceRange};
    use crate::types::TypeSet;
    use talus_support::{Arena, StringTable};

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn empty_function_has_no_edges() {
        let arena = Arena::new();
        let func = new_function(&arena);
        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
    }

    #[test]
    fn branch_creates_a_pred_succ_edge() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let entry = func.make_block();
        let exit = func.make_block();
        func.append_inst(entry, InstKind::Branch(exit), TypeSet::ANY, SourceRange::default());
        func.append_inst(exit, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        assert_eq!(cfg.succ_iter(entry).collect::<Vec<_>>(), vec![exit]);
        assert_eq!(cfg.pred_iter(exit).collect::<Vec<_>>(), vec![entry]);
        assert_eq!(cfg.pred_count(entry), 0);
    }

    #[test]
    fn cond_branch_creates_two_successors() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let entry = func.make_block();
        let then_block = func.make_block();
        let else_block = func.make_block();
        let cond = value_of(&mut func, entry);
        func.append_inst(
            entry,
            InstKind::CondBranch {
                cond: Operand { value: cond, user_index: 0 },
                then_block,
                else_block,
            },
            TypeSet::ANY,
            SourceRange::default(),
        );
        func.append_inst(then_block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());
        func.append_inst(else_block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut succs: Vec<_> = cfg.succ_iter(entry).collect();
        succs.sort_by_key(|b| format!("{b}"));
        let mut expected = vec![then_block, else_block];
        expected.sort_by_key(|b| format!("{b}"));
        assert_eq!(succs, expected);
    }

    fn value_of(func: &mut Function, block: Ebb) -> crate::entities::Value {
        crate::entities::Value::from(func.append_inst(
            block,
            InstKind::LoadParam(0),
            TypeSet::BOOLEAN,
            SourceRange::default(),
        ))
    }
}
