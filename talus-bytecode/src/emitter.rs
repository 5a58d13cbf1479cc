//! Per-function bytecode emission.
//!
//! Blocks are walked in reverse postorder, same as the allocator's own
//! numbering. Each instruction's opcode and operand bytes are appended
//! directly to the output; jump instructions record a `Relocation` and
//! leave a zeroed placeholder of the chosen width in their place. Once the
//! whole function is emitted, every block's start offset is known, so a
//! resolution pass fills in each relocation's real delta — widening any
//! short jump that doesn't fit an `i8` to its `Long` form and starting
//! over, until a fixed point is reached.

use std::collections::{HashMap, HashSet};
use talus_entity::EntityRef;
use talus_ir::{BinOp, ControlFlowGraph, DominatorTree, Ebb, Function, Inst, InstKind, Literal, LiteralPool, UnOp, Value};
use talus_regalloc::RegisterAllocation;

use crate::instruction_table::Opcode;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EmitError {
    #[error("register {0} does not fit the 8-bit register operand encoding")]
    RegisterOutOfRange(u32),
    #[error("jump offset {offset} at output byte {location} does not fit a {width}-byte encoding")]
    OffsetOutOfRange { location: u32, width: u32, offset: i64 },
}

/// A deferred fixup: once every block's start offset is known, write the
/// signed delta to `target_block` at `write_at`, computed against `from`
/// (the instruction-pointer value the interpreter holds once it has
/// decoded this jump, i.e. just past its encoded bytes).
struct Relocation {
    inst: Inst,
    write_at: u32,
    width: u32,
    from: u32,
    target_block: Ebb,
}

pub struct EncodedFunction {
    pub bytes: Vec<u8>,
    pub block_offsets: HashMap<Ebb, u32>,
}

pub fn emit(func: &Function, literals: &LiteralPool, allocation: &RegisterAllocation) -> Result<EncodedFunction, EmitError> {
    let mut cfg = ControlFlowGraph::new();
    cfg.compute(func);
    let mut domtree = DominatorTree::new();
    domtree.compute(func, &cfg);
    let block_order: Vec<Ebb> = domtree.cfg_postorder().iter().rev().copied().collect();

    let mut long: HashSet<Inst> = HashSet::new();

    loop {
        let (bytes, block_offsets, relocations) = emit_once(func, &block_order, literals, allocation, &long)?;

        let mut widened = false;
        for reloc in &relocations {
            if reloc.width != 1 {
                continue;
            }
            let target = block_offsets[&reloc.target_block];
            let delta = target as i64 - reloc.from as i64;
            if i8::try_from(delta).is_err() {
                long.insert(reloc.inst);
                widened = true;
            }
        }
        if widened {
            continue;
        }

        let mut bytes = bytes;
        for reloc in &relocations {
            let target = block_offsets[&reloc.target_block];
            let delta = target as i64 - reloc.from as i64;
            match reloc.width {
                1 => {
                    let offset = i8::try_from(delta)
                        .map_err(|_| EmitError::OffsetOutOfRange { location: reloc.write_at, width: 1, offset: delta })?;
                    bytes[reloc.write_at as usize] = offset as u8;
                }
                4 => {
                    let offset = i32::try_from(delta)
                        .map_err(|_| EmitError::OffsetOutOfRange { location: reloc.write_at, width: 4, offset: delta })?;
                    bytes[reloc.write_at as usize..reloc.write_at as usize + 4].copy_from_slice(&offset.to_le_bytes());
                }
                _ => unreachable!("relocations are only ever 1 or 4 bytes wide"),
            }
        }
        return Ok(EncodedFunction { bytes, block_offsets });
    }
}

fn emit_once(
    func: &Function,
    block_order: &[Ebb],
    literals: &LiteralPool,
    allocation: &RegisterAllocation,
    long: &HashSet<Inst>,
) -> Result<(Vec<u8>, HashMap<Ebb, u32>, Vec<Relocation>), EmitError> {
    let mut bytes = Vec::new();
    let mut block_offsets = HashMap::new();
    let mut relocations = Vec::new();

    for &block in block_order {
        block_offsets.insert(block, bytes.len() as u32);
        for &inst in &func.blocks[block].insts {
            emit_inst(func, inst, literals, allocation, long.contains(&inst), &mut bytes, &mut relocations)?;
        }
    }

    Ok((bytes, block_offsets, relocations))
}

fn reg(allocation: &RegisterAllocation, value: Value, bytes: &mut Vec<u8>) -> Result<(), EmitError> {
    let r = allocation.register_of(value);
    let r = u8::try_from(r).map_err(|_| EmitError::RegisterOutOfRange(r))?;
    bytes.push(r);
    Ok(())
}

fn opcode(op: Opcode, bytes: &mut Vec<u8>) {
    bytes.push(op as u8);
}

fn jump_placeholder(width: u32, bytes: &mut Vec<u8>) -> u32 {
    let at = bytes.len() as u32;
    bytes.extend(std::iter::repeat(0u8).take(width as usize));
    at
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
        BinOp::StrictEq => Opcode::StrictEq,
        BinOp::StrictNe => Opcode::StrictNe,
    }
}

fn unop_opcode(op: UnOp) -> Opcode {
    match op {
        UnOp::Neg => Opcode::Neg,
        UnOp::Not => Opcode::Not,
        UnOp::TypeOf => Opcode::TypeOf,
    }
}

fn emit_inst(
    func: &Function,
    inst: Inst,
    literals: &LiteralPool,
    allocation: &RegisterAllocation,
    is_long: bool,
    bytes: &mut Vec<u8>,
    relocations: &mut Vec<Relocation>,
) -> Result<(), EmitError> {
    let kind = &func.insts[inst].kind;
    let dst = Value::from(inst);

    match kind {
        InstKind::LoadConst(lit) => emit_load_const(literals.get(*lit), lit.index() as u32, dst, allocation, bytes)?,
        InstKind::LoadParam(idx) => {
            opcode(Opcode::LoadParam, bytes);
            reg(allocation, dst, bytes)?;
            bytes.extend_from_slice(&idx.to_le_bytes());
        }
        InstKind::LoadGlobalFunc(id) => {
            opcode(Opcode::LoadFunc, bytes);
            reg(allocation, dst, bytes)?;
            bytes.extend_from_slice(&(id.index() as u32).to_le_bytes());
        }
        InstKind::Mov(src) => {
            opcode(Opcode::Mov, bytes);
            reg(allocation, dst, bytes)?;
            reg(allocation, src.value(), bytes)?;
        }
        InstKind::AllocStack => {
            // A stack slot has no runtime representation of its own; it is
            // addressed purely through the `LoadStack`/`StoreStack` that
            // target it, so allocating one emits nothing.
        }
        InstKind::LoadStack(slot) => {
            opcode(Opcode::LoadStack, bytes);
            reg(allocation, dst, bytes)?;
            reg(allocation, slot.value(), bytes)?;
        }
        InstKind::StoreStack { slot, value } => {
            opcode(Opcode::StoreStack, bytes);
            reg(allocation, slot.value(), bytes)?;
            reg(allocation, value.value(), bytes)?;
        }
        InstKind::BinaryOp { op, lhs, rhs } => {
            opcode(binop_opcode(*op), bytes);
            reg(allocation, dst, bytes)?;
            reg(allocation, lhs.value(), bytes)?;
            reg(allocation, rhs.value(), bytes)?;
        }
        InstKind::UnaryOp { op, operand } => {
            opcode(unop_opcode(*op), bytes);
            reg(allocation, dst, bytes)?;
            reg(allocation, operand.value(), bytes)?;
        }
        InstKind::Branch(target) => {
            let op = if is_long { Opcode::JmpLong } else { Opcode::Jmp };
            opcode(op, bytes);
            let width = if is_long { 4 } else { 1 };
            let write_at = jump_placeholder(width, bytes);
            relocations.push(Relocation { inst, write_at, width, from: bytes.len() as u32, target_block: *target });
        }
        InstKind::CondBranch { cond, then_block, else_block } => {
            let op = if is_long { Opcode::JmpTrueLong } else { Opcode::JmpTrue };
            opcode(op, bytes);
            let width = if is_long { 4 } else { 1 };
            let write_at = jump_placeholder(width, bytes);
            reg(allocation, cond.value(), bytes)?;
            relocations.push(Relocation { inst, write_at, width, from: bytes.len() as u32, target_block: *then_block });

            let op = if is_long { Opcode::JmpFalseLong } else { Opcode::JmpFalse };
            opcode(op, bytes);
            let write_at = jump_placeholder(width, bytes);
            reg(allocation, cond.value(), bytes)?;
            relocations.push(Relocation { inst, write_at, width, from: bytes.len() as u32, target_block: *else_block });
        }
        InstKind::Return(Some(value)) => {
            opcode(Opcode::Ret, bytes);
            reg(allocation, value.value(), bytes)?;
        }
        InstKind::Return(None) => {
            opcode(Opcode::RetUndef, bytes);
        }
        InstKind::Phi(_) => {
            unreachable!("phi lowering runs before emission; no phi should remain")
        }
        InstKind::Call { callee, args } => {
            opcode(Opcode::Call, bytes);
            reg(allocation, dst, bytes)?;
            reg(allocation, callee.value(), bytes)?;
            let n = u8::try_from(args.len()).map_err(|_| EmitError::RegisterOutOfRange(args.len() as u32))?;
            bytes.push(n);
            for arg in args {
                reg(allocation, arg.value(), bytes)?;
            }
        }
    }
    Ok(())
}

fn emit_load_const(literal: Literal, string_id: u32, dst: Value, allocation: &RegisterAllocation, bytes: &mut Vec<u8>) -> Result<(), EmitError> {
    match literal {
        Literal::Number(n) if n.to_bits() == 0.0f64.to_bits() => {
            opcode(Opcode::LoadConstZero, bytes);
            reg(allocation, dst, bytes)?;
        }
        Literal::Number(n) if n.fract() == 0.0 && (0.0..=255.0).contains(&n) => {
            opcode(Opcode::LoadConstUInt8, bytes);
            reg(allocation, dst, bytes)?;
            bytes.push(n as u8);
        }
        Literal::Number(n) => {
            opcode(Opcode::LoadConstDouble, bytes);
            reg(allocation, dst, bytes)?;
            bytes.extend_from_slice(&n.to_le_bytes());
        }
        Literal::Bool(true) => {
            opcode(Opcode::LoadConstTrue, bytes);
            reg(allocation, dst, bytes)?;
        }
        Literal::Bool(false) => {
            opcode(Opcode::LoadConstFalse, bytes);
            reg(allocation, dst, bytes)?;
        }
        Literal::Null => {
            opcode(Opcode::LoadConstNull, bytes);
            reg(allocation, dst, bytes)?;
        }
        Literal::Undefined => {
            opcode(Opcode::LoadConstUndefined, bytes);
            reg(allocation, dst, bytes)?;
        }
        Literal::Empty => {
            opcode(Opcode::LoadConstEmpty, bytes);
            reg(allocation, dst, bytes)?;
        }
        Literal::String(_) => {
            opcode(Opcode::LoadConstString, bytes);
            reg(allocation, dst, bytes)?;
            // The literal pool doubles as the string table; a literal's own
            // pool index is a perfectly good string id.
            bytes.extend_from_slice(&string_id.to_le_bytes());
        }
    }
    Ok(())
}
