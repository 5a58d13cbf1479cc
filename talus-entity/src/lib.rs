//! Typed index collections used throughout the Talus IR.
//!
//! The IR is a cyclic object graph (instruction <-> block <-> function,
//! plus value <-> user back-edges). Rather than model that with `Rc`/`RefCell`
//! or unsafe raw pointers, every node lives in a dense per-kind table and is
//! referenced by a small `Copy` index type. This module provides the index
//! trait and the two map flavors the rest of the workspace builds on.

mod map;
mod packed_option;
mod primary;
mod set;

pub use map::SecondaryMap;
pub use packed_option::{PackedOption, ReservedValue};
pub use primary::PrimaryMap;
pub use set::EntitySet;

/// A type that can be used as a key in `PrimaryMap`/`SecondaryMap`: a small
/// `Copy` handle backed by a dense `u32` index.
pub trait EntityRef: Copy + Eq {
    /// Create a new entity reference from a linear index.
    fn new(index: usize) -> Self;

    /// Get the index of this reference.
    fn index(self) -> usize;
}

/// Declare a new entity reference type wrapping a `u32`, along with its
/// `EntityRef`, `Debug`, and `Display` implementations.
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident, $display_prefix:expr) => {
        impl $crate::EntityRef for $entity {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $crate::ReservedValue for $entity {
            fn reserved_value() -> Self {
                $entity(u32::MAX)
            }

            fn is_reserved_value(&self) -> bool {
                self.0 == u32::MAX
            }
        }

        impl ::core::fmt::Display for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl ::core::fmt::Debug for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                (self as &dyn ::core::fmt::Display).fmt(f)
            }
        }
    };
    ($entity:ident) => {
        entity_impl!($entity, "");
    };
}
