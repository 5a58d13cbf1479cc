//! Structural verification of a function's invariants.
//!
//! Every pass is expected to leave a function in a state that passes
//! `verify_function`: exactly one terminator per block, in the last
//! position; phis contiguous at the start of a block; and every recorded
//! operand pointing back at a use-list entry that actually names it.

use crate::entities::{Ebb, Inst};
use crate::function::Function;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("block {block} is empty")]
    EmptyBlock { block: Ebb },

    #[error("block {block}'s last instruction {inst} is not a terminator")]
    MissingTerminator { block: Ebb, inst: Inst },

    #[error("block {block} has a terminator {inst} before its last instruction")]
    EarlyTerminator { block: Ebb, inst: Inst },

    #[error("block {block} has a phi {inst} after a non-phi instruction")]
    PhiNotLeading { block: Ebb, inst: Inst },

    #[error("use-list entry for {inst} slot {slot} does not point back at its own operand")]
    BrokenUseList { inst: Inst, slot: usize },
}

/// Check every structural invariant described above, returning every
/// violation found rather than stopping at the first one.
pub fn verify_function(func: &Function) -> Vec<VerifierError> {
    let mut errors = Vec::new();

    for &block in &func.block_order {
        let insts = &func.blocks[block].insts;
        let Some((&last, rest)) = insts.split_last() else {
            errors.push(VerifierError::EmptyBlock { block });
            continue;
        };

        if !func.insts[last].kind.is_terminator() {
            errors.push(VerifierError::MissingTerminator { block, inst: last });
        }
        for &inst in rest {
            if func.insts[inst].kind.is_terminator() {
                errors.push(VerifierError::EarlyTerminator { block, inst });
            }
        }

        let mut seen_non_phi = false;
        for &inst in insts {
            let is_phi = func.insts[inst].kind.is_phi();
            if is_phi && seen_non_phi {
                errors.push(VerifierError::PhiNotLeading { block, inst });
            }
            if !is_phi {
                seen_non_phi = true;
            }
        }
    }

    for (inst, data) in func.insts.iter() {
        for (slot, operand) in data.kind.operands().iter().enumerate() {
            let found = func
                .uses_of(operand.value())
                .any(|(user_inst, user_slot)| user_inst == inst && user_slot == slot);
            if !found {
                errors.push(VerifierError::BrokenUseList { inst, slot });
            }
        }
    }

    errors
}
