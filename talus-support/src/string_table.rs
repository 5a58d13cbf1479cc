//! String interning with stable pointer identity.

use crate::Arena;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An interned string. Two `UniqueString`s compare equal iff they were
/// interned from equal content in the same `StringTable` — in practice this
/// means comparison is just a pointer check, since the table never interns
/// the same content twice.
#[derive(Clone, Copy)]
pub struct UniqueString<'a>(&'a str);

impl<'a> UniqueString<'a> {
    /// Borrow the interned string's contents.
    pub fn as_str(self) -> &'a str {
        self.0
    }

    fn address(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl<'a> PartialEq for UniqueString<'a> {
    fn eq(&self, other: &Self) -> bool {
        let same_ptr = std::ptr::eq(self.0, other.0);
        debug_assert_eq!(
            same_ptr,
            self.0 == other.0,
            "two UniqueStrings with equal content but different identity: table is broken"
        );
        same_ptr
    }
}

impl<'a> Eq for UniqueString<'a> {}

impl<'a> Hash for UniqueString<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl<'a> fmt::Display for UniqueString<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl<'a> fmt::Debug for UniqueString<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A wrapper around `UniqueString` carrying value semantics and an ordering
/// by pointer address. The ordering is only useful to get a deterministic
/// iteration order *within* a single compilation run (e.g. for test
/// reproducibility); it does not reflect lexical order and is never stable
/// across runs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Identifier<'a>(UniqueString<'a>);

impl<'a> Identifier<'a> {
    /// The identifier's text.
    pub fn as_str(self) -> &'a str {
        self.0.as_str()
    }
}

impl<'a> fmt::Display for Identifier<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'a> PartialOrd for Identifier<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for Identifier<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.address().cmp(&other.0.address())
    }
}

/// Interns byte ranges into an owning arena, handing back `UniqueString`s
/// with stable pointer identity. Strings are never interned twice: a second
/// request for the same content returns the original allocation.
pub struct StringTable<'a> {
    arena: &'a Arena,
    entries: HashMap<&'a str, UniqueString<'a>>,
}

impl<'a> StringTable<'a> {
    /// Create a new, empty string table backed by `arena`.
    pub fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            entries: HashMap::new(),
        }
    }

    /// Intern `text`, returning the unique string for its content.
    pub fn intern(&mut self, text: &str) -> UniqueString<'a> {
        if let Some(existing) = self.entries.get(text) {
            return *existing;
        }
        let owned = self.arena.alloc_str(text);
        let unique = UniqueString(owned);
        self.entries.insert(owned, unique);
        unique
    }

    /// Intern `text` as an `Identifier`.
    pub fn intern_identifier(&mut self, text: &str) -> Identifier<'a> {
        Identifier(self.intern(text))
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent_by_pointer() {
        let arena = Arena::new();
        let mut table = StringTable::new(&arena);
        let a = table.intern("hello");
        let b = table.intern("hello");
        let c = table.intern("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(std::ptr::eq(a.as_str(), b.as_str()));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn identifier_ordering_is_a_total_order_within_a_run() {
        let arena = Arena::new();
        let mut table = StringTable::new(&arena);
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|s| table.intern_identifier(s))
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        // Same elements, some order - determinism is the only guarantee.
        let mut as_set: Vec<_> = ids.iter().map(|i| i.as_str()).collect();
        let mut sorted_set: Vec<_> = sorted.iter().map(|i| i.as_str()).collect();
        as_set.sort();
        sorted_set.sort();
        assert_eq!(as_set, sorted_set);
    }
}
