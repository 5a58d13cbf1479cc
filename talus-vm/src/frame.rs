//! A register-windowed call frame. Frames are kept in a plain `Vec`
//! rather than linked through an explicit `prev` pointer — unwinding a
//! call is just popping the stack, and the frame's position already
//! plays the role `prev` would.
//!
//! Incoming arguments live in their own `params` array, not in
//! `registers`: the register allocator has no notion that a given
//! register index is "the caller's argument N and hasn't been read
//! yet," so a canonical `LoadParam` can be assigned any register the
//! allocator likes without risking that some other, earlier-numbered
//! instruction gets assigned the same index and clobbers an argument
//! before `LoadParam` copies it out.

use crate::value::Value;

pub struct Frame {
    pub ip: usize,
    pub func_index: usize,
    pub registers: Vec<Value>,
    params: Vec<Value>,
    /// Where the caller wants this frame's return value, `None` for the
    /// outermost frame (there is no caller to write back into).
    pub return_register: Option<u8>,
}

impl Frame {
    pub fn new(func_index: usize, register_count: usize, args: &[Value], param_count: usize, return_register: Option<u8>) -> Frame {
        let mut params = vec![Value::undefined(); param_count];
        for (slot, &arg) in params.iter_mut().zip(args) {
            *slot = arg;
        }
        Frame { ip: 0, func_index, registers: vec![Value::undefined(); register_count], params, return_register }
    }

    pub fn get(&self, r: u8) -> Value {
        self.registers.get(r as usize).copied().unwrap_or_else(Value::undefined)
    }

    pub fn set(&mut self, r: u8, v: Value) {
        self.registers[r as usize] = v;
    }

    pub fn get_param(&self, idx: u8) -> Value {
        self.params.get(idx as usize).copied().unwrap_or_else(Value::undefined)
    }
}
