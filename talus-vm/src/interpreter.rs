//! The dispatch loop: read the opcode byte, decode its fixed operand
//! sequence, perform the operation, advance `ip`. Dispatch is a `match`
//! on the opcode byte — without computed goto, the compiler turns a
//! dense `match` like this into a jump table on its own.

use talus_bytecode::Opcode;

use crate::error::Error;
use crate::frame::Frame;
use crate::heap::HeapRegionSpace;
use crate::objects::{HeapObject, ObjectTable};
use crate::value::{HeapRef, Value};

pub const MAX_FRAME_DEPTH: u32 = 4096;

/// One function's emitted bytecode plus the register-window size its
/// allocation requires.
pub struct CompiledFunction {
    pub bytes: Vec<u8>,
    pub register_count: u32,
    pub param_count: u32,
}

pub struct Interpreter<'f> {
    functions: &'f [CompiledFunction],
    frames: Vec<Frame>,
}

fn read_u8(bytes: &[u8], ip: &mut usize) -> u8 {
    let b = bytes[*ip];
    *ip += 1;
    b
}

fn read_i8(bytes: &[u8], ip: &mut usize) -> i8 {
    read_u8(bytes, ip) as i8
}

fn read_u32(bytes: &[u8], ip: &mut usize) -> u32 {
    let v = u32::from_le_bytes(bytes[*ip..*ip + 4].try_into().unwrap());
    *ip += 4;
    v
}

fn read_i32(bytes: &[u8], ip: &mut usize) -> i32 {
    read_u32(bytes, ip) as i32
}

fn read_f64(bytes: &[u8], ip: &mut usize) -> f64 {
    let v = f64::from_le_bytes(bytes[*ip..*ip + 8].try_into().unwrap());
    *ip += 8;
    v
}

impl<'f> Interpreter<'f> {
    pub fn new(functions: &'f [CompiledFunction]) -> Interpreter<'f> {
        Interpreter { functions, frames: Vec::new() }
    }

    /// Runs `entry` to completion with `args` as its initial parameters,
    /// returning the value its outermost `Ret` produces.
    pub fn run(&mut self, entry: usize, args: &[Value], heap: &mut HeapRegionSpace, objects: &mut ObjectTable) -> Result<Value, Error> {
        self.push_frame(entry, args, None)?;

        loop {
            let frame = self.frames.last().expect("run always keeps at least one frame until it returns");
            let bytes = &self.functions[frame.func_index].bytes;
            if frame.ip >= bytes.len() {
                // A function whose last block is unreachable or whose
                // encoder omitted a trailing Ret falls off the end;
                // treat it as an implicit `return undefined`.
                if let Some(v) = self.pop_frame(Value::undefined()) {
                    return Ok(v);
                }
                continue;
            }

            if let Some(result) = self.step(heap, objects)? {
                return Ok(result);
            }
        }
    }

    fn push_frame(&mut self, func_index: usize, args: &[Value], return_register: Option<u8>) -> Result<(), Error> {
        if self.frames.len() as u32 >= MAX_FRAME_DEPTH {
            return Err(Error::StackOverflow(MAX_FRAME_DEPTH));
        }
        let f = &self.functions[func_index];
        let frame = Frame::new(func_index, f.register_count as usize, args, f.param_count as usize, return_register);
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the current frame, writing `value` back into the caller's
    /// designated register. Returns `Some(value)` once the outermost
    /// frame itself returns (nothing left to pop into).
    fn pop_frame(&mut self, value: Value) -> Option<Value> {
        let frame = self.frames.pop().expect("pop_frame is only called while a frame is active");
        match frame.return_register {
            Some(r) => {
                let caller = self.frames.last_mut().expect("a return register implies a caller frame exists");
                caller.set(r, value);
                None
            }
            None => Some(value),
        }
    }

    /// Executes exactly one instruction. Returns `Some(value)` if this
    /// step was the outermost frame's `Ret`.
    fn step(&mut self, heap: &mut HeapRegionSpace, objects: &mut ObjectTable) -> Result<Option<Value>, Error> {
        // `self.functions` is a plain `&'f [CompiledFunction]` field, so
        // copying it out of `self` borrows nothing — `bytes` stays valid
        // independently of the `&mut self.frames` borrow taken below.
        let functions = self.functions;
        let frame_idx = self.frames.len() - 1;
        let func_index = self.frames[frame_idx].func_index;
        let bytes = &functions[func_index].bytes;

        let mut ip = self.frames[frame_idx].ip;
        let op_byte = read_u8(bytes, &mut ip);
        let opcode = Opcode::try_from(op_byte).map_err(|e| Error::UnknownOpcode(e.0))?;

        let frame = &mut self.frames[frame_idx];

        macro_rules! reg {
            () => {{
                read_u8(bytes, &mut ip)
            }};
        }

        let result = match opcode {
            Opcode::LoadConstUInt8 => {
                let dst = reg!();
                let imm = read_u8(bytes, &mut ip);
                frame.set(dst, Value::number(imm as f64));
                None
            }
            Opcode::LoadConstDouble => {
                let dst = reg!();
                let imm = read_f64(bytes, &mut ip);
                frame.set(dst, Value::number(imm));
                None
            }
            Opcode::LoadConstTrue => {
                let dst = reg!();
                frame.set(dst, Value::bool(true));
                None
            }
            Opcode::LoadConstFalse => {
                let dst = reg!();
                frame.set(dst, Value::bool(false));
                None
            }
            Opcode::LoadConstNull => {
                let dst = reg!();
                frame.set(dst, Value::null());
                None
            }
            Opcode::LoadConstUndefined => {
                let dst = reg!();
                frame.set(dst, Value::undefined());
                None
            }
            Opcode::LoadConstEmpty => {
                let dst = reg!();
                frame.set(dst, Value::empty());
                None
            }
            Opcode::LoadConstZero => {
                let dst = reg!();
                frame.set(dst, Value::number(0.0));
                None
            }
            Opcode::LoadConstString => {
                let dst = reg!();
                let _string_id = read_u32(bytes, &mut ip);
                // String interning/materialization is a collaborator
                // concern (§1); the demo programs this interpreter runs
                // don't exercise string literals end to end.
                frame.set(dst, Value::undefined());
                None
            }
            Opcode::LoadParam => {
                let dst = reg!();
                let idx = read_u32(bytes, &mut ip);
                let v = frame.get_param(idx as u8);
                frame.set(dst, v);
                None
            }
            Opcode::LoadFunc => {
                let dst = reg!();
                let func_id = read_u32(bytes, &mut ip);
                frame.set(dst, Value::function(func_id));
                None
            }
            Opcode::Mov => {
                let dst = reg!();
                let src = reg!();
                let v = frame.get(src);
                frame.set(dst, v);
                None
            }
            Opcode::LoadStack => {
                let dst = reg!();
                let slot = reg!();
                let v = frame.get(slot);
                frame.set(dst, v);
                None
            }
            Opcode::StoreStack => {
                let slot = reg!();
                let value = reg!();
                let v = frame.get(value);
                frame.set(slot, v);
                None
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod | Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le
            | Opcode::Gt | Opcode::Ge | Opcode::And | Opcode::Or | Opcode::StrictEq | Opcode::StrictNe => {
                let dst = reg!();
                let lhs = frame.get(reg!());
                let rhs = frame.get(reg!());
                frame.set(dst, binary_op(opcode, lhs, rhs, heap, objects));
                None
            }
            Opcode::Neg => {
                let dst = reg!();
                let src = frame.get(reg!());
                frame.set(dst, Value::number(-src.to_number()));
                None
            }
            Opcode::Not => {
                let dst = reg!();
                let src = frame.get(reg!());
                frame.set(dst, Value::bool(!truthy(src)));
                None
            }
            Opcode::TypeOf => {
                let dst = reg!();
                let src = frame.get(reg!());
                let _ = src;
                frame.set(dst, Value::undefined());
                None
            }
            Opcode::Jmp => {
                let off = read_i8(bytes, &mut ip);
                ip = (ip as i64 + off as i64) as usize;
                None
            }
            Opcode::JmpLong => {
                let off = read_i32(bytes, &mut ip);
                ip = (ip as i64 + off as i64) as usize;
                None
            }
            Opcode::JmpTrue => {
                let off = read_i8(bytes, &mut ip);
                let cond = frame.get(reg!());
                if truthy(cond) {
                    ip = (ip as i64 + off as i64) as usize;
                }
                None
            }
            Opcode::JmpTrueLong => {
                let off = read_i32(bytes, &mut ip);
                let cond = frame.get(reg!());
                if truthy(cond) {
                    ip = (ip as i64 + off as i64) as usize;
                }
                None
            }
            Opcode::JmpFalse => {
                let off = read_i8(bytes, &mut ip);
                let cond = frame.get(reg!());
                if !truthy(cond) {
                    ip = (ip as i64 + off as i64) as usize;
                }
                None
            }
            Opcode::JmpFalseLong => {
                let off = read_i32(bytes, &mut ip);
                let cond = frame.get(reg!());
                if !truthy(cond) {
                    ip = (ip as i64 + off as i64) as usize;
                }
                None
            }
            Opcode::Ret => {
                let v = frame.get(reg!());
                frame.ip = ip;
                return Ok(self.pop_frame(v));
            }
            Opcode::RetUndef => {
                frame.ip = ip;
                return Ok(self.pop_frame(Value::undefined()));
            }
            Opcode::Call => {
                let dst = reg!();
                let callee_reg = reg!();
                let n_args = read_u8(bytes, &mut ip);
                let callee = frame.get(callee_reg);
                let args: Vec<Value> = (0..n_args).map(|_| frame.get(reg!())).collect();
                frame.ip = ip;
                if !callee.is_function() {
                    return Err(Error::NotCallable(callee.type_name()));
                }
                self.push_frame(callee.as_function_index() as usize, &args, Some(dst))?;
                return Ok(None);
            }
        };

        self.frames.last_mut().unwrap().ip = ip;
        Ok(result)
    }
}

fn truthy(v: Value) -> bool {
    if v.is_bool() {
        v.as_bool()
    } else if v.is_number() {
        v.as_number() != 0.0 && !v.as_number().is_nan()
    } else {
        v.is_object() || v.is_string()
    }
}

fn binary_op(opcode: Opcode, lhs: Value, rhs: Value, heap: &mut HeapRegionSpace, objects: &mut ObjectTable) -> Value {
    match opcode {
        Opcode::Add => {
            if lhs.is_number() && rhs.is_number() {
                Value::number(lhs.as_number() + rhs.as_number())
            } else if lhs.is_string() || rhs.is_string() {
                concat_strings(lhs, rhs, heap, objects)
            } else {
                Value::number(lhs.to_number() + rhs.to_number())
            }
        }
        Opcode::Sub => Value::number(lhs.to_number() - rhs.to_number()),
        Opcode::Mul => Value::number(lhs.to_number() * rhs.to_number()),
        Opcode::Div => Value::number(lhs.to_number() / rhs.to_number()),
        Opcode::Mod => {
            let (l, r) = (lhs.to_number(), rhs.to_number());
            Value::number(l - r * (l / r).trunc())
        }
        Opcode::Eq | Opcode::StrictEq => Value::bool(strict_eq(lhs, rhs, objects)),
        Opcode::Ne | Opcode::StrictNe => Value::bool(!strict_eq(lhs, rhs, objects)),
        Opcode::Lt => Value::bool(lhs.to_number() < rhs.to_number()),
        Opcode::Le => Value::bool(lhs.to_number() <= rhs.to_number()),
        Opcode::Gt => Value::bool(lhs.to_number() > rhs.to_number()),
        Opcode::Ge => Value::bool(lhs.to_number() >= rhs.to_number()),
        Opcode::And => Value::bool(truthy(lhs) && truthy(rhs)),
        Opcode::Or => Value::bool(truthy(lhs) || truthy(rhs)),
        _ => unreachable!("binary_op is only called for the arithmetic/comparison opcode family"),
    }
}

/// Strict equality per the interpreter's semantics: numbers by value (NaN
/// never equals itself, +0 == -0 falls out of plain `f64` comparison),
/// strings by content, everything else by raw bit pattern.
fn strict_eq(lhs: Value, rhs: Value, objects: &ObjectTable) -> bool {
    if lhs.is_number() && rhs.is_number() {
        return lhs.as_number() == rhs.as_number();
    }
    if lhs.is_string() && rhs.is_string() {
        let ls = objects.get(lhs.as_heap_ref());
        let rs = objects.get(rhs.as_heap_ref());
        return match (ls, rs) {
            (Some(HeapObject::Str(a)), Some(HeapObject::Str(b))) => a == b,
            _ => lhs.raw() == rhs.raw(),
        };
    }
    lhs.raw() == rhs.raw()
}

fn concat_strings(lhs: Value, rhs: Value, heap: &mut HeapRegionSpace, objects: &mut ObjectTable) -> Value {
    let to_text = |v: Value, objects: &ObjectTable| -> String {
        if v.is_string() {
            match objects.get(v.as_heap_ref()) {
                Some(HeapObject::Str(s)) => s.clone(),
                _ => String::new(),
            }
        } else if v.is_number() {
            v.as_number().to_string()
        } else if v.is_bool() {
            v.as_bool().to_string()
        } else if v.is_null() {
            "null".to_string()
        } else {
            "undefined".to_string()
        }
    };
    let text = format!("{}{}", to_text(lhs, objects), to_text(rhs, objects));
    let ptr = heap.alloc(8).expect("string allocation failure is reported before reaching this arithmetic path");
    let addr = HeapRef::from_addr(ptr.as_ptr() as usize);
    objects.insert(addr, HeapObject::Str(text));
    Value::string(addr)
}
