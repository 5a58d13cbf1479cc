//! Local and global liveness over basic blocks.
//!
//! Per-block `gen`/`kill` sets are computed the usual way, treating a phi
//! like any other instruction that reads all of its operands — which means
//! `gen` for a join block ends up including every predecessor's
//! contribution, not just the one relevant to a given incoming edge. The
//! backward dataflow corrects for that with a per-edge `mask_in`: each
//! predecessor subtracts its siblings' phi contributions from what it
//! inherits as live-in, since those values never need to stay live through
//! a predecessor that isn't their source.

use std::collections::{HashMap, HashSet};
use talus_ir::{ControlFlowGraph, Ebb, Function, InstKind, Value};

#[derive(Clone, Debug, Default)]
pub struct Liveness {
    pub live_in: HashMap<Ebb, HashSet<Value>>,
    pub live_out: HashMap<Ebb, HashSet<Value>>,
}

impl Liveness {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let mut gen = HashMap::new();
        let mut kill = HashMap::new();
        let mut live_in = HashMap::new();
        let mut live_out = HashMap::new();
        for &block in &func.block_order {
            let (g, k) = local_sets(func, block);
            gen.insert(block, g);
            kill.insert(block, k);
            live_in.insert(block, HashSet::new());
            live_out.insert(block, HashSet::new());
        }

        let mask_in = mask_in_sets(func, cfg);
        let no_mask = HashSet::new();

        let mut changed = true;
        while changed {
            changed = false;
            for &block in &func.block_order {
                let mut out: HashSet<Value> = HashSet::new();
                for succ in cfg.succ_iter(block) {
                    out.extend(live_in[&succ].iter().copied());
                }

                let mask = mask_in.get(&block).unwrap_or(&no_mask);
                let mut new_in: HashSet<Value> =
                    out.difference(&kill[&block]).filter(|v| !mask.contains(v)).copied().collect();
                new_in.extend(gen[&block].iter().copied());

                if out != live_out[&block] {
                    live_out.insert(block, out);
                    changed = true;
                }
                if new_in != live_in[&block] {
                    live_in.insert(block, new_in);
                    changed = true;
                }
            }
        }

        Liveness { live_in, live_out }
    }
}

fn local_sets(func: &Function, block: Ebb) -> (HashSet<Value>, HashSet<Value>) {
    let mut gen = HashSet::new();
    let mut defined = HashSet::new();
    for &inst in &func.blocks[block].insts {
        for operand in func.insts[inst].kind.operands() {
            let value = operand.value();
            if !defined.contains(&value) {
                gen.insert(value);
            }
        }
        if func.insts[inst].kind.defines_value() {
            defined.insert(Value::from(inst));
        }
    }
    (gen, defined)
}

/// For each predecessor `pred`, the phi-incoming values of `pred`'s
/// successors that are sourced from some other predecessor.
fn mask_in_sets(func: &Function, cfg: &ControlFlowGraph) -> HashMap<Ebb, HashSet<Value>> {
    let mut mask_in: HashMap<Ebb, HashSet<Value>> = HashMap::new();
    for &block in &func.block_order {
        for &inst in &func.blocks[block].insts {
            let InstKind::Phi(incoming) = &func.insts[inst].kind else {
                continue;
            };
            for &(operand, owner) in incoming.iter() {
                for pred in cfg.pred_iter(block) {
                    if pred != owner {
                        mask_in.entry(pred).or_default().insert(operand.value());
                    }
                }
            }
        }
    }
    mask_in
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::SourceRange;
    use talus_ir::{BinOp, Operand, TypeSet};
    use talus_support::{Arena, StringTable};

    fn new_function(arena: &Arena) -> Function {
        let mut strings = StringTable::new(arena);
        Function::new(strings.intern("f"), 0, TypeSet::ANY)
    }

    #[test]
    fn a_value_used_across_blocks_is_live_through_the_branch() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let entry = func.make_block();
        let exit = func.make_block();
        let a = Value::from(func.append_inst(entry, InstKind::LoadParam(0), TypeSet::NUMBER, SourceRange::default()));
        func.append_inst(entry, InstKind::Branch(exit), TypeSet::ANY, SourceRange::default());
        func.append_inst(
            exit,
            InstKind::BinaryOp { op: BinOp::Add, lhs: Operand::new_unlinked(a), rhs: Operand::new_unlinked(a) },
            TypeSet::NUMBER,
            SourceRange::default(),
        );
        func.append_inst(exit, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let liveness = Liveness::compute(&func, &cfg);
        assert!(liveness.live_out[&entry].contains(&a));
        assert!(liveness.live_in[&exit].contains(&a));
    }

    #[test]
    fn a_sibling_predecessors_phi_source_does_not_leak_into_this_predecessors_live_out() {
        let arena = Arena::new();
        let mut func = new_function(&arena);
        let entry = func.make_block();
        let left = func.make_block();
        let right = func.make_block();
        let join = func.make_block();

        let cond = Value::from(func.append_inst(entry, InstKind::LoadParam(0), TypeSet::BOOLEAN, SourceRange::default()));
        func.append_inst(
            entry,
            InstKind::CondBranch { cond: Operand::new_unlinked(cond), then_block: left, else_block: right },
            TypeSet::ANY,
            SourceRange::default(),
        );
        let left_value = Value::from(func.append_inst(left, InstKind::LoadParam(1), TypeSet::NUMBER, SourceRange::default()));
        func.append_inst(left, InstKind::Branch(join), TypeSet::ANY, SourceRange::default());
        let right_value = Value::from(func.append_inst(right, InstKind::LoadParam(2), TypeSet::NUMBER, SourceRange::default()));
        func.append_inst(right, InstKind::Branch(join), TypeSet::ANY, SourceRange::default());
        func.append_inst(
            join,
            InstKind::Phi(smallvec::smallvec![
                (Operand::new_unlinked(left_value), left),
                (Operand::new_unlinked(right_value), right),
            ]),
            TypeSet::NUMBER,
            SourceRange::default(),
        );
        func.append_inst(join, InstKind::Return(None), TypeSet::ANY, SourceRange::default());

        let mut cfg = ControlFlowGraph::new();
        cfg.compute(&func);
        let liveness = Liveness::compute(&func, &cfg);
        assert!(!liveness.live_out[&left].contains(&right_value));
        assert!(!liveness.live_out[&right].contains(&left_value));
    }
}
