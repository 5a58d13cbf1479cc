//! A minimal textual disassembler: one line per instruction, of the form
//! `offset: OPCODE operand, operand, ...`. Wrapping the byte stream in a
//! `Disassembly` and letting `Display` do the printing keeps callers from
//! having to thread a `Write` through.

use std::fmt;

use crate::instruction_table::{InvalidOpcode, Opcode, OperandKind};

pub struct Disassembly<'a>(pub &'a [u8]);

impl<'a> fmt::Display for Disassembly<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ip = 0usize;
        let bytes = self.0;
        while ip < bytes.len() {
            let start = ip;
            let opcode = match Opcode::try_from(bytes[ip]) {
                Ok(op) => op,
                Err(InvalidOpcode(byte)) => {
                    writeln!(f, "{start:>6}: <invalid opcode {byte:#04x}>")?;
                    ip += 1;
                    continue;
                }
            };
            ip += 1;

            let mut operands = Vec::new();
            let mut call_arg_count = None;
            for kind in opcode.operand_shape() {
                let width = kind.width();
                let slice = &bytes[ip..ip + width];
                if opcode == Opcode::Call && *kind == OperandKind::UInt8 {
                    call_arg_count = Some(slice[0]);
                }
                operands.push(format_operand(*kind, slice));
                ip += width;
            }
            // `Call`'s declared shape stops at the argument count; the
            // emitter follows it with one Reg per argument.
            if let Some(n) = call_arg_count {
                for _ in 0..n {
                    let slice = &bytes[ip..ip + 1];
                    operands.push(format_operand(OperandKind::Reg, slice));
                    ip += 1;
                }
            }

            write!(f, "{start:>6}: {}", opcode.name())?;
            if !operands.is_empty() {
                write!(f, " {}", operands.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn format_operand(kind: OperandKind, bytes: &[u8]) -> String {
    match kind {
        OperandKind::Reg => format!("r{}", bytes[0]),
        OperandKind::UInt8 => bytes[0].to_string(),
        OperandKind::Int8 => (bytes[0] as i8).to_string(),
        OperandKind::UInt16 => u16::from_le_bytes([bytes[0], bytes[1]]).to_string(),
        OperandKind::UInt32 => u32::from_le_bytes(bytes.try_into().unwrap()).to_string(),
        OperandKind::Int32 => i32::from_le_bytes(bytes.try_into().unwrap()).to_string(),
        OperandKind::Double => f64::from_le_bytes(bytes.try_into().unwrap()).to_string(),
        OperandKind::StringId => format!("$s{}", u32::from_le_bytes(bytes.try_into().unwrap())),
        OperandKind::FuncId => format!("$f{}", u32::from_le_bytes(bytes.try_into().unwrap())),
    }
}
