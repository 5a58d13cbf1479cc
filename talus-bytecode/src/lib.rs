//! Bytecode emission: turns a register-allocated IR function into the
//! final byte stream the interpreter runs, plus a disassembler for
//! inspecting the result.

mod disasm;
mod emitter;
mod instruction_table;

pub use disasm::Disassembly;
pub use emitter::{emit, EmitError, EncodedFunction};
pub use instruction_table::{InvalidOpcode, Opcode, OperandKind};
