//! The insertion-cursor IR builder and the AST-to-IR lowering pass.

mod builder;
mod irgen;

pub use builder::IrBuilder;
pub use irgen::lower_program;
