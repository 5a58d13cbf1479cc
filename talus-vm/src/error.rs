//! Every fatal condition the runtime can hit, each distinguishable by
//! code so a wrapping binary can report it without downcasting.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("out of memory")]
    OutOfMemory,
    #[error("unknown opcode byte {0:#04x}: corrupted bytecode stream")]
    UnknownOpcode(u8),
    #[error("stack overflow: frame chain exceeded depth {0}")]
    StackOverflow(u32),
    #[error("value of type {0} is not callable")]
    NotCallable(&'static str),
    #[error("bytecode emission failed: {0}")]
    Emit(#[from] talus_bytecode::EmitError),
    #[error("IR generation failed: {0}")]
    IrGen(String),
    #[error("pass pipeline failed: {0}")]
    Compile(#[from] talus_ir::CompileError),
    #[error("program declares no `main` function")]
    NoEntryPoint,
}
