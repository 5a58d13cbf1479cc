//! Instructions and their operands.

use crate::entities::{Ebb, FuncId, LiteralId, Value};
use crate::types::TypeSet;
use smallvec::SmallVec;

pub use talus_ast::SourceRange;

/// A use of a `Value` inside an instruction's operand list.
///
/// Each operand remembers the index of its own entry in the used value's
/// user list (`Function::users`). That lets `Function::change_operand`
/// rewire a use in O(1): swap-remove the stale entry, patch whatever entry
/// the swap moved into that slot, then append a fresh entry to the new
/// value's user list and record its index here.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Operand {
    pub(crate) value: Value,
    pub(crate) user_index: u32,
}

impl Operand {
    pub fn value(self) -> Value {
        self.value
    }

    /// Construct an operand not yet linked into any value's user list.
    /// `Function::append_inst` fills in the real `user_index` when the
    /// instruction is appended; callers outside this crate (IR-gen, the
    /// passes) never need to set it themselves.
    pub fn new_unlinked(value: Value) -> Operand {
        Operand { value, user_index: 0 }
    }
}

/// A record of one operand's physical location, stored in the used value's
/// user list so that `change_operand` can find and patch it.
#[derive(Clone, Copy, Debug)]
pub struct UserEntry {
    pub inst: crate::entities::Inst,
    pub slot: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    StrictEq,
    StrictNe,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    Neg,
    Not,
    TypeOf,
}

/// The operation an instruction performs. Every kind that reads a `Value`
/// does so through an `Operand`, and every kind that transfers control
/// names the target `Ebb` directly (blocks aren't SSA values).
#[derive(Clone, Debug)]
pub enum InstKind {
    LoadConst(LiteralId),
    LoadParam(u32),
    AllocStack,
    LoadStack(Operand),
    StoreStack { slot: Operand, value: Operand },
    BinaryOp { op: BinOp, lhs: Operand, rhs: Operand },
    UnaryOp { op: UnOp, operand: Operand },
    Mov(Operand),
    Branch(Ebb),
    CondBranch { cond: Operand, then_block: Ebb, else_block: Ebb },
    Return(Option<Operand>),
    /// Incoming values for each predecessor `Ebb`. Must appear only at the
    /// start of a block, contiguous with any other phis.
    Phi(SmallVec<[(Operand, Ebb); 4]>),
    /// A reference to a module-level function, used as the callee operand
    /// of a direct `Call`. Closures over captured state are out of scope.
    LoadGlobalFunc(FuncId),
    Call { callee: Operand, args: SmallVec<[Operand; 4]> },
}

impl InstKind {
    /// Does this instruction end a basic block?
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Branch(_) | InstKind::CondBranch { .. } | InstKind::Return(_)
        )
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, InstKind::Phi(_))
    }

    /// Does this instruction define a value? All but `StoreStack`, the
    /// branches, and `Return` do.
    pub fn defines_value(&self) -> bool {
        !matches!(
            self,
            InstKind::StoreStack { .. }
                | InstKind::Branch(_)
                | InstKind::CondBranch { .. }
                | InstKind::Return(_)
        )
    }

    /// Does this instruction write to heap-observable state, such that DCE
    /// must not remove it even with no users? Only `StoreStack` today;
    /// calls are conservatively treated as having observable effects too.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, InstKind::StoreStack { .. } | InstKind::Call { .. })
    }

    /// The blocks this instruction may transfer control to, in emission order.
    pub fn branch_targets(&self) -> SmallVec<[Ebb; 2]> {
        match self {
            InstKind::Branch(target) => SmallVec::from_slice(&[*target]),
            InstKind::CondBranch { then_block, else_block, .. } => {
                SmallVec::from_slice(&[*then_block, *else_block])
            }
            _ => SmallVec::new(),
        }
    }

    /// Read-only view over this instruction's operands, in a stable order.
    pub fn operands(&self) -> SmallVec<[Operand; 4]> {
        match self {
            InstKind::LoadConst(_) | InstKind::LoadParam(_) | InstKind::AllocStack => {
                SmallVec::new()
            }
            InstKind::LoadStack(slot) => SmallVec::from_slice(&[*slot]),
            InstKind::StoreStack { slot, value } => SmallVec::from_slice(&[*slot, *value]),
            InstKind::BinaryOp { lhs, rhs, .. } => SmallVec::from_slice(&[*lhs, *rhs]),
            InstKind::UnaryOp { operand, .. } => SmallVec::from_slice(&[*operand]),
            InstKind::Mov(operand) => SmallVec::from_slice(&[*operand]),
            InstKind::Branch(_) => SmallVec::new(),
            InstKind::CondBranch { cond, .. } => SmallVec::from_slice(&[*cond]),
            InstKind::Return(value) => value.iter().copied().collect(),
            InstKind::Phi(incoming) => incoming.iter().map(|(operand, _)| *operand).collect(),
            InstKind::LoadGlobalFunc(_) => SmallVec::new(),
            InstKind::Call { callee, args } => {
                let mut ops = SmallVec::from_slice(&[*callee]);
                ops.extend(args.iter().copied());
                ops
            }
        }
    }

    /// Mutable access to the operand at `slot`, in the same order `operands()` enumerates.
    pub fn operand_mut(&mut self, slot: usize) -> &mut Operand {
        match self {
            InstKind::LoadStack(o) if slot == 0 => o,
            InstKind::StoreStack { slot: s, value } => {
                if slot == 0 {
                    s
                } else if slot == 1 {
                    value
                } else {
                    panic!("operand slot {slot} out of range for StoreStack")
                }
            }
            InstKind::BinaryOp { lhs, rhs, .. } => {
                if slot == 0 {
                    lhs
                } else if slot == 1 {
                    rhs
                } else {
                    panic!("operand slot {slot} out of range for BinaryOp")
                }
            }
            InstKind::UnaryOp { operand, .. } if slot == 0 => operand,
            InstKind::Mov(o) if slot == 0 => o,
            InstKind::CondBranch { cond, .. } if slot == 0 => cond,
            InstKind::Return(Some(o)) if slot == 0 => o,
            InstKind::Phi(incoming) => {
                &mut incoming
                    .get_mut(slot)
                    .unwrap_or_else(|| panic!("operand slot {slot} out of range for Phi"))
                    .0
            }
            InstKind::Call { callee, args } => {
                if slot == 0 {
                    callee
                } else {
                    args.get_mut(slot - 1)
                        .unwrap_or_else(|| panic!("operand slot {slot} out of range for Call"))
                }
            }
            _ => panic!("operand slot {slot} out of range"),
        }
    }
}

/// An instruction together with its result type, owning block, and source
/// location.
#[derive(Clone, Debug)]
pub struct InstructionData {
    pub kind: InstKind,
    pub ty: TypeSet,
    pub block: Ebb,
    pub range: SourceRange,
}
