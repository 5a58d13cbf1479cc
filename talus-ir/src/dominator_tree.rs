//! Dominator tree construction.
//!
//! Computes immediate dominators with the Cooper-Harvey-Kennedy algorithm
//! ("A Simple, Fast Dominance Algorithm"): number blocks by reverse
//! postorder, then repeatedly walk each block's predecessors pairwise up
//! their partially-known idom chains to their nearest common ancestor,
//! until a fixed point is reached.

use crate::entities::Ebb;
use crate::flowgraph::ControlFlowGraph;
use crate::function::Function;
use talus_entity::{PackedOption, SecondaryMap};

/// The dominator tree of one function's control flow graph.
#[derive(Clone, Debug, Default)]
pub struct DominatorTree {
    /// Immediate dominator of each block, indexed by reverse-postorder rank
    /// internally but keyed by `Ebb` for lookups.
    idoms: SecondaryMap<Ebb, PackedOption<Ebb>>,
    /// Reverse postorder rank, used as the ordering for the CHK walk.
    rpo_number: SecondaryMap<Ebb, u32>,
    postorder: Vec<Ebb>,
}

impl DominatorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)compute the tree for `func`'s current layout, using `cfg` for
    /// predecessor/successor edges.
    pub fn compute(&mut self, func: &Function, cfg: &ControlFlowGraph) {
        self.idoms.clear();
        self.rpo_number.clear();
        self.postorder.clear();

        let Some(entry) = func.entry_block() else {
            return;
        };

        self.postorder_from(cfg, entry);
        for (rank, &block) in self.postorder.iter().rev().enumerate() {
            self.rpo_number[block] = rank as u32;
        }
        self.idoms[entry] = PackedOption::from(entry);

        let mut changed = true;
        while changed {
            changed = false;
            // Walk in reverse postorder, skipping the entry block.
            for &block in self.postorder.iter().rev().skip(1) {
                let mut new_idom: Option<Ebb> = None;
                for pred in cfg.pred_iter(block) {
                    if self.idoms[pred].expand().is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(candidate) => self.intersect(candidate, pred),
                    });
                }
                if let Some(idom) = new_idom {
                    if self.idoms[block].expand() != Some(idom) {
                        self.idoms[block] = PackedOption::from(idom);
                        changed = true;
                    }
                }
            }
        }
    }

    fn postorder_from(&mut self, cfg: &ControlFlowGraph, entry: Ebb) {
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![(entry, cfg.succ_iter(entry).collect::<Vec<_>>().into_iter())];
        visited.insert(entry);
        while let Some((block, iter)) = stack.last_mut() {
            if let Some(succ) = iter.next() {
                if visited.insert(succ) {
                    let succs = cfg.succ_iter(succ).collect::<Vec<_>>().into_iter();
                    stack.push((succ, succs));
                }
            } else {
                self.postorder.push(*block);
                stack.pop();
            }
        }
    }

    /// Nearest common ancestor of `a` and `b` in the (partially built) tree,
    /// found by alternately stepping the shallower finger up its idom chain.
    fn intersect(&self, mut a: Ebb, mut b: Ebb) -> Ebb {
        while a != b {
            while self.rpo_number[a] > self.rpo_number[b] {
                a = self.idoms[a].expand().expect("idom chain is incomplete");
            }
            while self.rpo_number[b] > self.rpo_number[a] {
                b = self.idoms[b].expand().expect("idom chain is incomplete");
            }
        }
        a
    }

    /// The immediate dominator of `block`, or `None` for the entry block.
    pub fn idom(&self, block: Ebb) -> Option<Ebb> {
        let idom = self.idoms[block].expand()?;
        if idom == block {
            None
        } else {
            Some(idom)
        }
    }

    /// Does `a` dominate `b` (reflexively: every block dominates itself)?
    pub fn dominates(&self, a: Ebb, b: Ebb) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.idom(cur) {
                Some(next) => cur = next,
                None => return cur == a,
            }
        }
    }

    /// Blocks in postorder, as visited while building the tree.
    pub fn cfg_postorder(&self) -> &[Ebb] {
        &self.postorder
    }

    /// The dominance frontier of `block`: every join point `block` reaches
    /// along some predecessor edge without strictly dominating it.
    /// Computed by the standard join-point walk (Cytron et al.): for every
    /// block with two or more predecessors, walk each predecessor up its
    /// idom chain until reaching the join point's own idom, marking every
    /// block visited along the way as having that join point in its
    /// frontier.
    pub fn frontier(&self, func: &Function, cfg: &ControlFlowGraph, block: Ebb) -> Vec<Ebb> {
        let mut frontier = Vec::new();
        for &join in &func.block_order {
            if cfg.pred_count(join) < 2 {
                continue;
            }
            let stop_at = self.idom(join);
            for pred in cfg.pred_iter(join) {
                let mut runner = pred;
                loop {
                    if Some(runner) == stop_at {
                        break;
                    }
                    if runner == block && !frontier.contains(&join) {
                        frontier.push(join);
                    }
                    match self.idom(runner) {
                        Some(next) => runner = next,
                        None => break,
                    }
                }
            }
        }
        frontier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::InstKind;
    use crate::types::TypeSet;
    use talus_ast::SourceRange;
    use talus_support::{Arena, StringTable};

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn diamond_has_entry_as_idom_of_join() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let entry = func.make_block();
        let left = func.make_block();
        let right = func.make_block();
        let join = func.make_block();

        let cond = crate::entities::Value::from(func.append_inst(
            entry,
            InstKind::LoadParam(0),
            TypeSet::BOOLEAN,
            SourceRange::default(),
        ));
        func.append_inst(
            entry,
            InstKind::CondBranch {
                cond: crate::instruction::Operand { value: cond, user_index: 0 },
                then_block: left,
                else_block: right,
            },
            TypeSet::ANY,
            SourceRange::default(),
        );
        func.append_inst(left, InstKind::Branch(join), TypeSet::ANY, SourceRange::default());
        func.append_inst(right, InstKind::Branch(join), TypeSet::ANY, SourceRange::default());
        func.append_inst(join, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut dt = DominatorTree::new();
        dt.compute(&func, &cfg);

        assert_eq!(dt.idom(join), Some(entry));
        assert_eq!(dt.idom(left), Some(entry));
        assert_eq!(dt.idom(right), Some(entry));
        assert_eq!(dt.idom(entry), None);
        assert!(dt.dominates(entry, join));
        assert!(!dt.dominates(left, join));
    }

    #[test]
    fn linear_chain_dominates_transitively() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let a = func.make_block();
        let b = func.make_block();
        let c = func.make_block();
        func.append_inst(a, InstKind::Branch(b), TypeSet::ANY, SourceRange::default());
        func.append_inst(b, InstKind::Branch(c), TypeSet::ANY, SourceRange::default());
        func.append_inst(c, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut dt = DominatorTree::new();
        dt.compute(&func, &cfg);

        assert!(dt.dominates(a, c));
        assert_eq!(dt.idom(c), Some(b));
        assert_eq!(dt.idom(b), Some(a));
    }
}
