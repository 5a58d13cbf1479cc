//! Insertion-cursor IR builder.
//!
//! Mirrors `cranelift_frontend::FunctionBuilder`'s cursor discipline: the
//! builder tracks a current block, and every `create_*` call appends to
//! that block and inherits its position. Unlike cranelift's builder this
//! one never needs to insert before an existing instruction — IR-gen only
//! ever appends — so there is no general cursor position, just "current
//! block."

use talus_ir::{BinOp, Ebb, FuncId, Function, InstKind, Operand, SourceRange, TypeSet, UnOp, Value};

/// A cursor into one `Function` under construction.
pub struct IrBuilder<'f, 'a> {
    func: &'f mut Function<'a>,
    block: Ebb,
}

impl<'f, 'a> IrBuilder<'f, 'a> {
    /// Begin building at `block`, which must already exist in `func`.
    pub fn new(func: &'f mut Function<'a>, block: Ebb) -> Self {
        Self { func, block }
    }

    pub fn create_block(&mut self) -> Ebb {
        self.func.make_block()
    }

    pub fn switch_to_block(&mut self, block: Ebb) {
        self.block = block;
    }

    pub fn current_block(&self) -> Ebb {
        self.block
    }

    /// Has the current block already been terminated? IR-gen checks this
    /// before falling off the end of a statement list, so it doesn't
    /// append a second terminator.
    pub fn is_terminated(&self) -> bool {
        self.func.blocks[self.block]
            .insts
            .last()
            .map(|&inst| self.func.insts[inst].kind.is_terminator())
            .unwrap_or(false)
    }

    fn append(&mut self, kind: InstKind, ty: TypeSet, range: SourceRange) -> Value {
        Value::from(self.func.append_inst(self.block, kind, ty, range))
    }

    pub fn load_const(&mut self, literal: talus_ir::LiteralId, ty: TypeSet, range: SourceRange) -> Value {
        self.append(InstKind::LoadConst(literal), ty, range)
    }

    pub fn load_param(&mut self, index: u32, range: SourceRange) -> Value {
        self.append(InstKind::LoadParam(index), TypeSet::ANY, range)
    }

    pub fn alloc_stack(&mut self, range: SourceRange) -> Value {
        self.append(InstKind::AllocStack, TypeSet::ANY, range)
    }

    pub fn load_stack(&mut self, slot: Value, range: SourceRange) -> Value {
        self.append(InstKind::LoadStack(operand(slot)), TypeSet::ANY, range)
    }

    pub fn store_stack(&mut self, slot: Value, value: Value, range: SourceRange) {
        self.append(
            InstKind::StoreStack { slot: operand(slot), value: operand(value) },
            TypeSet::ANY,
            range,
        );
    }

    pub fn binary_op(&mut self, op: BinOp, lhs: Value, rhs: Value, range: SourceRange) -> Value {
        self.append(
            InstKind::BinaryOp { op, lhs: operand(lhs), rhs: operand(rhs) },
            binary_op_type(op),
            range,
        )
    }

    pub fn unary_op(&mut self, op: UnOp, value: Value, range: SourceRange) -> Value {
        self.append(InstKind::UnaryOp { op, operand: operand(value) }, TypeSet::ANY, range)
    }

    pub fn branch(&mut self, target: Ebb, range: SourceRange) {
        self.append(InstKind::Branch(target), TypeSet::ANY, range);
    }

    pub fn cond_branch(&mut self, cond: Value, then_block: Ebb, else_block: Ebb, range: SourceRange) {
        self.append(
            InstKind::CondBranch { cond: operand(cond), then_block, else_block },
            TypeSet::ANY,
            range,
        );
    }

    pub fn return_(&mut self, value: Option<Value>, range: SourceRange) {
        self.append(InstKind::Return(value.map(operand)), TypeSet::ANY, range);
    }

    pub fn load_global_func(&mut self, func_id: FuncId, range: SourceRange) -> Value {
        self.append(InstKind::LoadGlobalFunc(func_id), TypeSet::CLOSURE, range)
    }

    pub fn call(&mut self, callee: Value, args: &[Value], range: SourceRange) -> Value {
        self.append(
            InstKind::Call {
                callee: operand(callee),
                args: args.iter().copied().map(operand).collect(),
            },
            TypeSet::ANY,
            range,
        )
    }
}

fn binary_op_type(op: BinOp) -> TypeSet {
    match op {
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        | BinOp::StrictEq | BinOp::StrictNe | BinOp::And | BinOp::Or => TypeSet::BOOLEAN,
        BinOp::Add => TypeSet::ANY,
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => TypeSet::NUMBER,
    }
}

/// An operand with a placeholder back-index; `Function::append_inst`
/// overwrites the real index once the value's user list is known.
fn operand(value: Value) -> Operand {
    Operand::new_unlinked(value)
}
