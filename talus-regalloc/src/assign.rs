//! Step 7: linear-scan assignment over coalesced groups.
//!
//! Two priority queues over instruction indices: intervals to process,
//! ordered by start, and the currently active set, ordered by end. Walking
//! to-process in order, every interval whose end has passed is expired
//! (its register returned to the free pool) before a register is taken for
//! the interval at hand.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use talus_ir::{Function, Value};

use crate::coalesce::Coalescing;
use crate::interval::LiveInterval;
use crate::numbering::Numbering;
use crate::register_set::RegisterSet;

/// `Value* -> register index`, per the source language's own framing; every
/// value in a coalesced group maps to its representative's register.
pub struct RegisterAllocation {
    register_of: HashMap<Value, u32>,
}

impl RegisterAllocation {
    pub fn register_of(&self, value: Value) -> u32 {
        self.register_of[&value]
    }

    /// One past the highest register index in use, i.e. the size a
    /// caller must give this function's register window.
    pub fn register_count(&self) -> u32 {
        self.register_of.values().copied().max().map_or(0, |max| max + 1)
    }
}

/// Tie-break key: interval end, then start, then the representative's own
/// numbering — matching "earlier-start wins, then lower numbering wins".
type Key = (u32, u32, u32, Value);

pub fn assign(
    func: &Function,
    numbering: &Numbering,
    intervals: &HashMap<Value, LiveInterval>,
    mut coalescing: Coalescing,
) -> RegisterAllocation {
    let mut group_range: HashMap<Value, (u32, u32)> = HashMap::new();
    for (&value, interval) in intervals {
        let rep = coalescing.representative(value);
        group_range
            .entry(rep)
            .and_modify(|(start, end)| {
                *start = (*start).min(interval.start);
                *end = (*end).max(interval.end);
            })
            .or_insert((interval.start, interval.end));
    }

    let mut to_process: BinaryHeap<Reverse<Key>> = group_range
        .iter()
        .map(|(&rep, &(start, end))| Reverse((start, end, numbering.index(rep.inst()), rep)))
        .collect();

    let mut active: BinaryHeap<Reverse<Key>> = BinaryHeap::new();
    let mut register_of_rep: HashMap<Value, u32> = HashMap::new();
    let mut regs = RegisterSet::new();

    while let Some(Reverse((start, end, tiebreak, rep))) = to_process.pop() {
        while let Some(&Reverse((active_end, _, _, active_rep))) = active.peek() {
            if active_end <= start {
                active.pop();
                let reg = register_of_rep[&active_rep];
                regs.free(reg);
            } else {
                break;
            }
        }
        let reg = regs.take();
        register_of_rep.insert(rep, reg);
        active.push(Reverse((end, start, tiebreak, rep)));
    }

    let register_of = intervals.keys().map(|&value| (value, register_of_rep[&coalescing.representative(value)])).collect();
    RegisterAllocation { register_of }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::SourceRange;
    use talus_ir::{ControlFlowGraph, DominatorTree, InstKind, Operand, TypeSet};
    use talus_support::{Arena, StringTable};

    use crate::coalesce::coalesce;
    use crate::liveness::Liveness;

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn disjoint_intervals_can_reuse_a_register() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let a = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        // `a` dies right here: it's never used again.
        let b = func.append_inst(block, InstKind::LoadParam(1), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(block, InstKind::Return(Some(Operand::new_unlinked(Value::from(b)))), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut domtree = DominatorTree::new();
        domtree.compute(&func, &cfg);
        let numbering = Numbering::compute(&func, &domtree);
        let liveness = Liveness::compute(&func, &cfg);
        let intervals = crate::interval::build(&func, &numbering, &liveness);
        let coalescing = coalesce(&func, &intervals);

        let allocation = assign(&func, &numbering, &intervals, coalescing);
        assert_eq!(allocation.register_of(Value::from(a)), allocation.register_of(Value::from(b)));
    }

    #[test]
    fn overlapping_intervals_get_distinct_registers() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let block = func.make_block();
        let a = func.append_inst(block, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default());
        let b = func.append_inst(block, InstKind::LoadParam(1), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(
            block,
            InstKind::BinaryOp {
                op: talus_ir::BinOp::Add,
                lhs: Operand::new_unlinked(Value::from(a)),
                rhs: Operand::new_unlinked(Value::from(b)),
            },
            TypeSet::NUMBER,
            SourceRange::default(),
        );
        func.append_inst(block, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut domtree = DominatorTree::new();
        domtree.compute(&func, &cfg);
        let numbering = Numbering::compute(&func, &domtree);
        let liveness = Liveness::compute(&func, &cfg);
        let intervals = crate::interval::build(&func, &numbering, &liveness);
        let coalescing = coalesce(&func, &intervals);

        let allocation = assign(&func, &numbering, &intervals, coalescing);
        assert_ne!(allocation.register_of(Value::from(a)), allocation.register_of(Value::from(b)));
    }
}
