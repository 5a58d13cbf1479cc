//! Removes blocks unreachable from the entry block.

use std::collections::HashSet;
use talus_ir::{ControlFlowGraph, Ebb, Function};

use crate::FunctionPass;

/// Deletes every block not reachable from the entry block, iterating to a
/// fixed point (deleting one unreachable block can make another, previously
/// reachable only through it, unreachable in turn).
pub struct SimplifyCfg;

impl FunctionPass for SimplifyCfg {
    fn name(&self) -> &'static str {
        "simplify_cfg"
    }

    fn run_on_function(&mut self, func: &mut Function) -> bool {
        let mut changed = false;
        loop {
            let Some(entry) = func.entry_block() else {
                break;
            };
            let mut cfg = ControlFlowGraph::new();
            cfg.compute(func);
            let reachable = reachable_from(&cfg, entry);
            let dead: Vec<Ebb> = func.block_order.iter().copied().filter(|b| !reachable.contains(b)).collect();
            if dead.is_empty() {
                break;
            }

            for &block in &dead {
                let successors: Vec<Ebb> = cfg.succ_iter(block).collect();
                for succ in successors {
                    if reachable.contains(&succ) {
                        drop_phi_incomings(func, succ, block);
                    }
                }
                let insts = func.blocks[block].insts.clone();
                for inst in insts {
                    func.erase_inst(inst);
                }
                func.remove_block_from_layout(block);
            }
            changed = true;
        }
        changed
    }
}

fn reachable_from(cfg: &ControlFlowGraph, entry: Ebb) -> HashSet<Ebb> {
    let mut seen = HashSet::new();
    let mut stack = vec![entry];
    seen.insert(entry);
    while let Some(block) = stack.pop() {
        for succ in cfg.succ_iter(block) {
            if seen.insert(succ) {
                stack.push(succ);
            }
        }
    }
    seen
}

fn drop_phi_incomings(func: &mut Function, block: Ebb, dead_pred: Ebb) {
    for &inst in func.blocks[block].insts.clone().iter() {
        if func.insts[inst].kind.is_phi() {
            func.remove_phi_incoming(inst, dead_pred);
        }
    }
}
