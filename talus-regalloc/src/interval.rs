//! Live interval construction: each SSA value gets one contiguous
//! `[start, end]` range of instruction numbers over which it must occupy a
//! register.

use std::collections::HashMap;
use talus_ir::{Function, InstKind, Value};

use crate::liveness::Liveness;
use crate::numbering::Numbering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveInterval {
    pub value: Value,
    pub start: u32,
    pub end: u32,
}

pub fn build(func: &Function, numbering: &Numbering, liveness: &Liveness) -> HashMap<Value, LiveInterval> {
    let mut intervals: HashMap<Value, LiveInterval> = HashMap::new();
    let touch = |intervals: &mut HashMap<Value, LiveInterval>, value: Value, at: u32| {
        intervals
            .entry(value)
            .and_modify(|interval| {
                interval.start = interval.start.min(at);
                interval.end = interval.end.max(at);
            })
            .or_insert(LiveInterval { value, start: at, end: at });
    };

    // Pass 1: every definition starts its interval at `n+1`; every operand
    // use extends the value it reads to include the using instruction's
    // `n+1`, except phi operands, which extend to their own predecessor's
    // terminator index rather than to the phi's position.
    for &block in &func.block_order {
        for &inst in &func.blocks[block].insts {
            let n = numbering.index(inst);
            let kind = &func.insts[inst].kind;

            if kind.defines_value() {
                touch(&mut intervals, Value::from(inst), n + 1);
            }

            if let InstKind::Phi(incoming) = kind {
                for &(operand, pred) in incoming.iter() {
                    touch(&mut intervals, operand.value(), numbering.block_end(pred));
                }
            } else {
                for operand in kind.operands() {
                    touch(&mut intervals, operand.value(), n + 1);
                }
            }
        }
    }

    // Pass 2: anything live-out of a block extends to that block's end,
    // run separately so it never depends on `func.block_order` happening
    // to visit a value's definition before its uses.
    for &block in &func.block_order {
        let Some(live_out) = liveness.live_out.get(&block) else {
            continue;
        };
        let end = numbering.block_end(block);
        for &value in live_out {
            touch(&mut intervals, value, end);
        }
    }

    intervals
}
