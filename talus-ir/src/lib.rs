//! SSA intermediate representation: functions, basic blocks, the control
//! flow graph, and the dominator tree built over them.

mod diagnostics;
mod dominator_tree;
mod entities;
mod flowgraph;
mod function;
mod instruction;
mod literal;
mod module;
mod types;
mod verify;

pub use diagnostics::{CompileError, Diagnostic, Severity};
pub use dominator_tree::DominatorTree;
pub use entities::{Ebb, FuncId, Inst, LiteralId, Value};
pub use flowgraph::ControlFlowGraph;
pub use function::{BasicBlockData, Function};
pub use instruction::{BinOp, InstKind, Operand, SourceRange, UnOp};
pub use literal::{Literal, LiteralKey};
pub use module::{LiteralPool, Module};
pub use types::TypeSet;
pub use verify::{verify_function, VerifierError};

/// How aggressively the pass pipeline should optimize.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum OptLevel {
    /// Only the lowering passes that every function needs to be executable
    /// (`LoadParameters`, `LoadConstants`) run; no CFG or SSA cleanup.
    None,
    /// The full pipeline: `SimplifyCFG`, `Mem2Reg`, `SimplifyCFG` again,
    /// `DCE`, then the lowering passes.
    #[default]
    Default,
}

/// Knobs threaded through IR-gen and the pass pipeline for one compilation.
#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    /// Run the structural verifier after IR-gen and after every pass.
    pub verify: bool,
    pub opt_level: OptLevel,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            verify: true,
            opt_level: OptLevel::default(),
        }
    }
}
