//! Coalescing: merge values into groups that end up sharing one physical
//! register, so `Mov`s between them can later be elided.
//!
//! (a) A phi and every `Mov` feeding one of its incoming edges are
//! force-merged — they must share a register for the lowered copies to
//! actually implement the phi. (b) Within a block, repeated `Mov`s of the
//! same source are merged into one group. (c) Any other `Mov src -> dst`
//! whose endpoints' live ranges don't overlap is merged too, as long as
//! neither side was already force-merged by (a).

use std::collections::{HashMap, HashSet};
use talus_ir::{Function, InstKind, Value};

use crate::interval::LiveInterval;

#[derive(Default)]
struct UnionFind {
    parent: HashMap<Value, Value>,
    range: HashMap<Value, (u32, u32)>,
}

impl UnionFind {
    fn new(intervals: &HashMap<Value, LiveInterval>) -> Self {
        let range = intervals.iter().map(|(&v, interval)| (v, (interval.start, interval.end))).collect();
        Self { parent: HashMap::new(), range }
    }

    fn find(&mut self, v: Value) -> Value {
        let parent = *self.parent.entry(v).or_insert(v);
        if parent == v {
            v
        } else {
            let root = self.find(parent);
            self.parent.insert(v, root);
            root
        }
    }

    /// Merge the groups containing `a` and `b`, widening the surviving
    /// root's recorded range to cover both.
    fn union(&mut self, a: Value, b: Value) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (a_start, a_end) = self.range[&ra];
        let (b_start, b_end) = self.range[&rb];
        self.range.insert(rb, (a_start.min(b_start), a_end.max(b_end)));
        self.parent.insert(ra, rb);
    }

    fn overlaps(&mut self, a: Value, b: Value) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        let (a_start, a_end) = self.range[&ra];
        let (b_start, b_end) = self.range[&rb];
        a_start <= b_end && b_start <= a_end
    }
}

/// Resolves every value to the representative of its coalesced group.
pub struct Coalescing {
    groups: UnionFind,
}

impl Coalescing {
    pub fn representative(&mut self, value: Value) -> Value {
        self.groups.find(value)
    }
}

pub fn coalesce(func: &Function, intervals: &HashMap<Value, LiveInterval>) -> Coalescing {
    let mut groups = UnionFind::new(intervals);
    let mut forced: HashSet<Value> = HashSet::new();

    for &block in &func.block_order {
        for &inst in &func.blocks[block].insts {
            if let InstKind::Phi(incoming) = &func.insts[inst].kind {
                let phi_value = Value::from(inst);
                forced.insert(phi_value);
                for &(operand, _) in incoming.iter() {
                    groups.union(phi_value, operand.value());
                    forced.insert(operand.value());
                }
            }
        }
    }

    for &block in &func.block_order {
        let mut first_mov_from: HashMap<Value, Value> = HashMap::new();
        for &inst in &func.blocks[block].insts {
            if let InstKind::Mov(operand) = &func.insts[inst].kind {
                let src = operand.value();
                let dst = Value::from(inst);
                match first_mov_from.get(&src) {
                    Some(&first) => groups.union(first, dst),
                    None => {
                        first_mov_from.insert(src, dst);
                    }
                }
            }
        }
    }

    for &block in &func.block_order {
        for &inst in &func.blocks[block].insts {
            let InstKind::Mov(operand) = &func.insts[inst].kind else {
                continue;
            };
            let dst = Value::from(inst);
            let src = operand.value();
            if forced.contains(&dst) || forced.contains(&src) {
                continue;
            }
            if groups.find(dst) == groups.find(src) {
                continue;
            }
            if !groups.overlaps(dst, src) {
                groups.union(dst, src);
            }
        }
    }

    Coalescing { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::SourceRange;
    use talus_ir::{ControlFlowGraph, DominatorTree, Operand, TypeSet};
    use talus_support::{Arena, StringTable};

    use crate::liveness::Liveness;
    use crate::numbering::Numbering;

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn non_overlapping_mov_endpoints_share_a_group() {
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

        let mut coalescing = coalesce(&func, &intervals);
        assert_eq!(coalescing.representative(Value::from(a)), coalescing.representative(Value::from(mov)));
    }

    #[test]
    fn phi_and_its_incoming_movs_are_forced_into_one_group() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let pred = func.make_block();
        let join = func.make_block();
        let v = Value::from(func.append_inst(pred, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default()));
        let mov = func.append_inst(pred, InstKind::Mov(Operand::new_unlinked(v)), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(pred, InstKind::Branch(join), TypeSet::ANY, SourceRange::default());
        let phi = func.append_inst(join, InstKind::Phi(smallvec::smallvec![(Operand::new_unlinked(Value::from(mov)), pred)]), TypeSet::NUMBER, SourceRange::default());
        func.append_inst(join, InstKind::Return(Some(Operand::new_unlinked(Value::from(phi)))), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let mut domtree = DominatorTree::new();
        domtree.compute(&func, &cfg);
        let numbering = Numbering::compute(&func, &domtree);
        let liveness = Liveness::compute(&func, &cfg);
        let intervals = crate::interval::build(&func, &numbering, &liveness);

        let mut coalescing = coalesce(&func, &intervals);
        assert_eq!(coalescing.representative(Value::from(phi)), coalescing.representative(Value::from(mov)));
    }
}
