//! Bump allocation and string interning.
//!
//! Everything the compiler core builds (IR nodes, interned strings) is owned
//! by one arena per compilation and freed in bulk when that arena is
//! dropped. This models a cyclic object graph without per-node reference
//! counting: no node is ever individually freed, so use-def back-edges can
//! point at each other without an ownership cycle.

mod arena;
mod string_table;

pub use arena::Arena;
pub use string_table::{Identifier, StringTable, UniqueString};
