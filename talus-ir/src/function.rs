//! A single function's body: blocks, instructions, and use-def edges.

use crate::entities::{Ebb, FuncId, Inst, Value};
use crate::instruction::{InstKind, InstructionData, Operand, SourceRange, UserEntry};
use crate::types::TypeSet;
use talus_entity::{EntityRef, PrimaryMap, SecondaryMap};

/// The ordered contents of one basic block. Phis, if any, occupy a
/// contiguous run at the start; the last instruction must be a terminator.
#[derive(Clone, Debug, Default)]
pub struct BasicBlockData {
    pub insts: Vec<Inst>,
}

/// A function body. Values and instructions share one identity (see
/// `Value`), so there is no separate value table: `insts` is both the
/// instruction store and, implicitly, the value store.
#[derive(Clone, Debug)]
pub struct Function<'a> {
    pub name: talus_support::UniqueString<'a>,
    pub param_count: u32,
    pub return_type: TypeSet,
    pub blocks: PrimaryMap<Ebb, BasicBlockData>,
    /// Block layout order; the first entry is the entry block.
    pub block_order: Vec<Ebb>,
    pub insts: PrimaryMap<Inst, InstructionData>,
    /// For every value, the set of operands that use it, each naming the
    /// instruction and operand slot where that use physically lives.
    users: SecondaryMap<Value, Vec<UserEntry>>,
}

impl<'a> Function<'a> {
    pub fn new(name: talus_support::UniqueString<'a>, param_count: u32, return_type: TypeSet) -> Self {
        Self {
            name,
            param_count,
            return_type,
            blocks: PrimaryMap::new(),
            block_order: Vec::new(),
            insts: PrimaryMap::new(),
            users: SecondaryMap::new(),
        }
    }

    /// Append a new, empty block to the layout and return its handle.
    pub fn make_block(&mut self) -> Ebb {
        let block = self.blocks.push(BasicBlockData::default());
        self.block_order.push(block);
        block
    }

    /// The entry block, if any blocks have been created.
    pub fn entry_block(&self) -> Option<Ebb> {
        self.block_order.first().copied()
    }

    /// Append an instruction to the end of `block`'s layout and register
    /// every operand it reads as a user of the corresponding value.
    pub fn append_inst(&mut self, block: Ebb, kind: InstKind, ty: TypeSet, range: SourceRange) -> Inst {
        let inst = self.create_inst(block, kind, ty, range);
        self.blocks[block].insts.push(inst);
        inst
    }

    /// Insert an instruction at the start of `block`'s layout, after any
    /// phis already there. Used by `Mem2Reg` to place the phi nodes stack
    /// slot promotion inserts before it rewrites the rest of the block.
    pub fn prepend_inst(&mut self, block: Ebb, kind: InstKind, ty: TypeSet, range: SourceRange) -> Inst {
        let inst = self.create_inst(block, kind, ty, range);
        let insert_at = self.blocks[block]
            .insts
            .iter()
            .position(|&i| !self.insts[i].kind.is_phi())
            .unwrap_or(self.blocks[block].insts.len());
        self.blocks[block].insts.insert(insert_at, inst);
        inst
    }

    /// Insert an instruction immediately before `block`'s terminator. Used
    /// by phi lowering to splice in the `Mov`s that break SSA edges into
    /// in-block copies before register allocation reasons about liveness.
    pub fn insert_before_terminator(&mut self, block: Ebb, kind: InstKind, ty: TypeSet, range: SourceRange) -> Inst {
        let inst = self.create_inst(block, kind, ty, range);
        let insts = &mut self.blocks[block].insts;
        let insert_at = insts.len().checked_sub(1).expect("block has no terminator to insert before");
        insts.insert(insert_at, inst);
        inst
    }

    fn create_inst(&mut self, block: Ebb, kind: InstKind, ty: TypeSet, range: SourceRange) -> Inst {
        let operand_count = kind.operands().len();
        let inst = self.insts.push(InstructionData { kind, ty, block, range });
        for slot in 0..operand_count {
            let used_value = self.insts[inst].kind.operands()[slot].value();
            self.record_user(inst, slot, used_value);
        }
        inst
    }

    /// Append a new incoming `(value, pred)` edge to an existing phi
    /// instruction, registering the new operand's use.
    pub fn add_phi_incoming(&mut self, inst: Inst, value: Value, pred: Ebb) {
        let slot = match &self.insts[inst].kind {
            InstKind::Phi(incoming) => incoming.len(),
            _ => panic!("add_phi_incoming called on a non-phi instruction"),
        };
        let InstKind::Phi(incoming) = &mut self.insts[inst].kind else {
            unreachable!("checked above")
        };
        incoming.push((Operand::new_unlinked(value), pred));
        self.record_user(inst, slot, value);
    }

    fn record_user(&mut self, inst: Inst, slot: usize, value: Value) {
        let list = &mut self.users[value];
        let user_index = list.len() as u32;
        list.push(UserEntry { inst, slot: slot as u32 });
        self.insts[inst].kind.operand_mut(slot).user_index = user_index;
    }

    /// Swap-remove entry `index` from `value`'s user list and patch
    /// whatever entry the swap displaced so its recorded index stays
    /// accurate. Shared by `change_operand` and `erase_inst`.
    fn unlink(&mut self, value: Value, index: usize) {
        let list = &mut self.users[value];
        list.swap_remove(index);
        if let Some(moved) = list.get(index).copied() {
            self.insts[moved.inst].kind.operand_mut(moved.slot as usize).user_index = index as u32;
        }
    }

    /// Rewire the operand at `(inst, slot)` to read `new_value` instead,
    /// in O(1): the stale entry in the old value's user list is
    /// swap-removed, the entry the swap displaced is patched to its new
    /// index, and a fresh entry is appended to the new value's user list.
    pub fn change_operand(&mut self, inst: Inst, slot: usize, new_value: Value) {
        let old_operand = *self.insts[inst].kind.operand_mut(slot);
        let old_index = old_operand.user_index as usize;
        self.unlink(old_operand.value(), old_index);
        self.record_user(inst, slot, new_value);
    }

    /// Detach `inst` from its block's layout and from the user list of
    /// every value it reads. `inst`'s own `InstructionData` stays in the
    /// `insts` map — nothing in this crate ever frees an individual
    /// instruction slot — but it no longer appears in any block or
    /// use list, so it is invisible to every later pass and to the
    /// verifier.
    pub fn erase_inst(&mut self, inst: Inst) {
        let block = self.insts[inst].block;
        self.blocks[block].insts.retain(|&i| i != inst);
        let operand_count = self.insts[inst].kind.operands().len();
        for slot in 0..operand_count {
            let operand = *self.insts[inst].kind.operand_mut(slot);
            self.unlink(operand.value(), operand.user_index as usize);
        }
    }

    /// Remove `block`'s layout entry. Callers must erase its instructions
    /// first (`erase_inst`); this only drops the block from
    /// `block_order`, it does not touch `blocks[block]` itself.
    pub fn remove_block_from_layout(&mut self, block: Ebb) {
        self.block_order.retain(|&b| b != block);
    }

    /// Remove the incoming value for predecessor `pred` from the phi
    /// instruction `inst`, if present. Unlinks the removed operand's use
    /// and re-patches the `user_index` of every entry after it, since
    /// removing an element from a phi's own operand vector shifts the
    /// slot of everything that followed it.
    pub fn remove_phi_incoming(&mut self, inst: Inst, pred: Ebb) {
        let InstKind::Phi(incoming) = &self.insts[inst].kind else {
            return;
        };
        let Some(removed_slot) = incoming.iter().position(|&(_, block)| block == pred) else {
            return;
        };
        let removed_operand = incoming[removed_slot].0;
        self.unlink(removed_operand.value(), removed_operand.user_index as usize);

        let InstKind::Phi(incoming) = &mut self.insts[inst].kind else {
            unreachable!("checked above")
        };
        incoming.remove(removed_slot);
        for slot in removed_slot..incoming.len() {
            let operand = incoming[slot].0;
            self.users[operand.value()][operand.user_index as usize].slot = slot as u32;
        }
    }

    /// Every use of `value`, as `(instruction, slot)` pairs. O(number of uses).
    pub fn uses_of(&self, value: Value) -> impl Iterator<Item = (Inst, usize)> + '_ {
        self.users[value]
            .iter()
            .map(|entry| (entry.inst, entry.slot as usize))
    }

    /// Number of remaining uses of `value`.
    pub fn use_count(&self, value: Value) -> usize {
        self.users[value].len()
    }

    /// Replace every remaining use of `old` with `new`. Used by DCE's
    /// dependents and by copy propagation.
    pub fn replace_all_uses(&mut self, old: Value, new: Value) {
        while let Some(entry) = self.users[old].last().copied() {
            self.change_operand(entry.inst, entry.slot as usize, new);
        }
    }
}
