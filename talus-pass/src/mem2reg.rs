//! Promotes stack slots that are never address-escaped back to SSA values.

use std::collections::{HashMap, HashSet};
use talus_ir::{ControlFlowGraph, DominatorTree, Ebb, Function, Inst, InstKind, TypeSet, Value};

use crate::FunctionPass;

/// A stack slot is promotable iff every use of its defining `AllocStack`
/// value is the address operand of a `LoadStack` or `StoreStack` — never
/// the value being stored (that would mean the address itself escaped into
/// memory) and never any other instruction kind.
pub struct Mem2Reg;

impl FunctionPass for Mem2Reg {
    fn name(&self) -> &'static str {
        "mem2reg"
    }

    fn run_on_function(&mut self, func: &mut Function) -> bool {
        let Some(entry) = func.entry_block() else {
            return false;
        };
        let mut cfg = ControlFlowGraph::new();
        cfg.compute(func);
        let mut domtree = DominatorTree::new();
        domtree.compute(func, &cfg);
        let children = dominator_children(func, &domtree);

        let candidates: Vec<Inst> = func
            .block_order
            .iter()
            .flat_map(|&b| func.blocks[b].insts.clone())
            .filter(|&i| matches!(func.insts[i].kind, InstKind::AllocStack))
            .collect();

        let mut changed = false;
        for alloc in candidates {
            let slot = Value::from(alloc);
            if promotable(func, slot) {
                promote(func, &cfg, &domtree, &children, entry, alloc, slot);
                changed = true;
            }
        }
        changed
    }
}

fn promotable(func: &Function, slot: Value) -> bool {
    func.uses_of(slot).all(|(inst, operand_slot)| {
        matches!(
            (&func.insts[inst].kind, operand_slot),
            (InstKind::LoadStack(_), 0) | (InstKind::StoreStack { .. }, 0)
        )
    })
}

fn dominator_children(func: &Function, domtree: &DominatorTree) -> HashMap<Ebb, Vec<Ebb>> {
    let mut children: HashMap<Ebb, Vec<Ebb>> = HashMap::new();
    for &block in &func.block_order {
        if let Some(idom) = domtree.idom(block) {
            children.entry(idom).or_default().push(block);
        }
    }
    children
}

/// The iterated dominance frontier of `def_blocks`: the set of join points
/// that need a phi for a value defined somewhere in `def_blocks`, closed
/// under adding newly-placed phis as definition sites in their own right.
fn iterated_dominance_frontier(
    func: &Function,
    cfg: &ControlFlowGraph,
    domtree: &DominatorTree,
    def_blocks: &HashSet<Ebb>,
) -> HashSet<Ebb> {
    let mut result = HashSet::new();
    let mut worklist: Vec<Ebb> = def_blocks.iter().copied().collect();
    let mut counted: HashSet<Ebb> = def_blocks.clone();
    while let Some(block) = worklist.pop() {
        for frontier_block in domtree.frontier(func, cfg, block) {
            if result.insert(frontier_block) && counted.insert(frontier_block) {
                worklist.push(frontier_block);
            }
        }
    }
    result
}

fn promote(
    func: &mut Function,
    cfg: &ControlFlowGraph,
    domtree: &DominatorTree,
    children: &HashMap<Ebb, Vec<Ebb>>,
    entry: Ebb,
    alloc: Inst,
    slot: Value,
) {
    let def_blocks: HashSet<Ebb> = func
        .uses_of(slot)
        .filter(|&(inst, _)| matches!(func.insts[inst].kind, InstKind::StoreStack { .. }))
        .map(|(inst, _)| func.insts[inst].block)
        .collect();

    let placement = iterated_dominance_frontier(func, cfg, domtree, &def_blocks);
    let ty = func.insts[alloc].ty;
    let phis: HashMap<Ebb, Inst> = placement
        .into_iter()
        .map(|block| (block, func.prepend_inst(block, InstKind::Phi(Default::default()), ty, Default::default())))
        .collect();

    let mut to_erase = vec![alloc];
    // DFS over the dominator tree from the entry block, threading the
    // current reaching definition of `slot` on an explicit stack rather
    // than via recursion.
    let mut stack: Vec<(Ebb, Option<Value>)> = vec![(entry, None)];
    while let Some((block, incoming_value)) = stack.pop() {
        let mut current = phis.get(&block).map(|&phi| Value::from(phi)).or(incoming_value);

        for inst in func.blocks[block].insts.clone() {
            match &func.insts[inst].kind {
                InstKind::LoadStack(addr) if addr.value() == slot => {
                    if let Some(value) = current {
                        func.replace_all_uses(Value::from(inst), value);
                    }
                    to_erase.push(inst);
                }
                InstKind::StoreStack { slot: addr, value } if addr.value() == slot => {
                    current = Some(value.value());
                    to_erase.push(inst);
                }
                _ => {}
            }
        }

        for succ in cfg.succ_iter(block) {
            if let Some(&phi) = phis.get(&succ) {
                let value = current.expect("every block reaching a phi has a reaching definition");
                func.add_phi_incoming(phi, value, block);
            }
        }

        for &child in children.get(&block).into_iter().flatten() {
            stack.push((child, current));
        }
    }

    for inst in to_erase {
        func.erase_inst(inst);
    }
}
