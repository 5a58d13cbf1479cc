//! Linear-scan register allocation over SSA.
//!
//! Run end to end: number instructions, lower phis into block-local `Mov`s,
//! compute liveness and live intervals, coalesce what can share a register,
//! assign registers, then fold away the `Mov`s coalescing made redundant.
//! Each pass runs in its own step, with its own log line.

mod assign;
mod coalesce;
mod interval;
mod liveness;
mod mov_elim;
mod numbering;
mod phi_lowering;
mod register_set;

pub use assign::RegisterAllocation;
pub use coalesce::Coalescing;
pub use interval::LiveInterval;
pub use liveness::Liveness;
pub use numbering::Numbering;
pub use register_set::RegisterSet;

use talus_ir::{ControlFlowGraph, DominatorTree, Function};

/// Allocate registers for `func` in place: `func` gains the `Mov`s phi
/// lowering needs and loses the ones coalescing made redundant, and the
/// returned allocation maps every remaining value to a register.
pub fn allocate(func: &mut Function) -> RegisterAllocation {
    log::debug!("regalloc: lowering phis in {}", func.name);
    phi_lowering::lower(func);

    let mut cfg = ControlFlowGraph::new();
    cfg.compute(func);
    let mut domtree = DominatorTree::new();
    domtree.compute(func, &cfg);

    let numbering = Numbering::compute(func, &domtree);
    log::debug!("regalloc: numbered {} instructions", numbering.order().len());

    let liveness = Liveness::compute(func, &cfg);
    let intervals = interval::build(func, &numbering, &liveness);
    log::debug!("regalloc: built {} live intervals", intervals.len());

    let coalescing = coalesce::coalesce(func, &intervals);
    let allocation = assign::assign(func, &numbering, &intervals, coalescing);
    log::debug!("regalloc: assigned registers");

    mov_elim::eliminate(func, &numbering, &allocation);
    log::debug!("regalloc: eliminated redundant movs in {}", func.name);

    allocation
}
