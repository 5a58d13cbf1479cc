//! A NaN-boxed 64-bit tagged value.
//!
//! A finite `f64` is stored as itself. Every non-double variant lives in
//! the negative quiet-NaN payload space: bit 63 (sign) and bits 52-62
//! (exponent) are all set, bit 51 marks the value as tagged rather than a
//! plain NaN, a 3-bit tag occupies bits 48-50, and pointer-carrying tags
//! use the remaining low 48 bits as a heap address. Any `f64` that is
//! itself NaN is canonicalized to a fixed, untagged bit pattern on the way
//! in, so the tagged region never collides with a real floating-point
//! value — this is what lets `is_number` be a single unsigned comparison.

const TAG_BASE: u64 = 0xfff8_0000_0000_0000;
const TAG_SHIFT: u32 = 48;
const TAG_MASK: u64 = 0b111 << TAG_SHIFT;
const PAYLOAD_MASK: u64 = (1u64 << 48) - 1;
const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
enum Tag {
    Empty = 0 << TAG_SHIFT,
    Undefined = 1 << TAG_SHIFT,
    Null = 2 << TAG_SHIFT,
    BoolFalse = 3 << TAG_SHIFT,
    BoolTrue = 4 << TAG_SHIFT,
    String = 5 << TAG_SHIFT,
    Object = 6 << TAG_SHIFT,
    /// A function reference: not a heap pointer, just an index into the
    /// runtime's function table (mirrors the "NativeValue" tag of the
    /// original's value encoding, which carries a raw `u32` payload).
    Function = 7 << TAG_SHIFT,
}

/// A 48-bit heap address, as stored in a pointer-tagged `Value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapRef(u64);

impl HeapRef {
    pub fn from_addr(addr: usize) -> HeapRef {
        debug_assert_eq!(addr as u64 & !PAYLOAD_MASK, 0, "heap address does not fit 48 bits");
        HeapRef(addr as u64 & PAYLOAD_MASK)
    }

    pub fn addr(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Value(u64);

impl Value {
    pub fn number(n: f64) -> Value {
        if n.is_nan() {
            Value(CANONICAL_NAN)
        } else {
            Value(n.to_bits())
        }
    }

    pub fn undefined() -> Value {
        Value(TAG_BASE | Tag::Undefined as u64)
    }

    pub fn null() -> Value {
        Value(TAG_BASE | Tag::Null as u64)
    }

    pub fn empty() -> Value {
        Value(TAG_BASE | Tag::Empty as u64)
    }

    pub fn bool(b: bool) -> Value {
        Value(TAG_BASE | if b { Tag::BoolTrue as u64 } else { Tag::BoolFalse as u64 })
    }

    pub fn string(r: HeapRef) -> Value {
        Value(TAG_BASE | Tag::String as u64 | r.0)
    }

    pub fn object(r: HeapRef) -> Value {
        Value(TAG_BASE | Tag::Object as u64 | r.0)
    }

    pub fn function(index: u32) -> Value {
        Value(TAG_BASE | Tag::Function as u64 | index as u64)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    fn tag(self) -> Option<Tag> {
        if self.0 < TAG_BASE {
            return None;
        }
        match self.0 & TAG_MASK {
            x if x == Tag::Empty as u64 => Some(Tag::Empty),
            x if x == Tag::Undefined as u64 => Some(Tag::Undefined),
            x if x == Tag::Null as u64 => Some(Tag::Null),
            x if x == Tag::BoolFalse as u64 => Some(Tag::BoolFalse),
            x if x == Tag::BoolTrue as u64 => Some(Tag::BoolTrue),
            x if x == Tag::String as u64 => Some(Tag::String),
            x if x == Tag::Object as u64 => Some(Tag::Object),
            x if x == Tag::Function as u64 => Some(Tag::Function),
            _ => None,
        }
    }

    pub fn is_number(self) -> bool {
        self.0 < TAG_BASE
    }

    pub fn is_undefined(self) -> bool {
        self.tag() == Some(Tag::Undefined)
    }

    pub fn is_null(self) -> bool {
        self.tag() == Some(Tag::Null)
    }

    pub fn is_empty(self) -> bool {
        self.tag() == Some(Tag::Empty)
    }

    pub fn is_bool(self) -> bool {
        matches!(self.tag(), Some(Tag::BoolTrue) | Some(Tag::BoolFalse))
    }

    pub fn is_string(self) -> bool {
        self.tag() == Some(Tag::String)
    }

    pub fn is_object(self) -> bool {
        self.tag() == Some(Tag::Object)
    }

    pub fn is_pointer(self) -> bool {
        self.is_string() || self.is_object()
    }

    pub fn is_function(self) -> bool {
        self.tag() == Some(Tag::Function)
    }

    pub fn as_number(self) -> f64 {
        debug_assert!(self.is_number());
        f64::from_bits(self.0)
    }

    pub fn as_bool(self) -> bool {
        debug_assert!(self.is_bool());
        self.tag() == Some(Tag::BoolTrue)
    }

    pub fn as_heap_ref(self) -> HeapRef {
        debug_assert!(self.is_pointer());
        HeapRef(self.0 & PAYLOAD_MASK)
    }

    pub fn as_function_index(self) -> u32 {
        debug_assert!(self.is_function());
        (self.0 & PAYLOAD_MASK) as u32
    }

    /// Coerce to a number per the interpreter's arithmetic rules: numbers
    /// pass through, booleans become 1.0/0.0, `null` becomes 0.0,
    /// everything else (undefined, objects, strings) becomes NaN.
    /// String-to-number parsing is out of scope.
    pub fn to_number(self) -> f64 {
        if self.is_number() {
            self.as_number()
        } else if self.is_bool() {
            if self.as_bool() {
                1.0
            } else {
                0.0
            }
        } else if self.is_null() {
            0.0
        } else {
            f64::NAN
        }
    }

    pub fn type_name(self) -> &'static str {
        if self.is_number() {
            "number"
        } else if self.is_bool() {
            "boolean"
        } else if self.is_string() {
            "string"
        } else if self.is_undefined() {
            "undefined"
        } else if self.is_null() {
            "null"
        } else if self.is_object() {
            "object"
        } else if self.is_function() {
            "function"
        } else {
            "empty"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn every_tagged_singleton_round_trips_through_its_own_predicate() {
        assert!(Value::undefined().is_undefined());
        assert!(Value::null().is_null());
        assert!(Value::empty().is_empty());
        assert!(Value::bool(true).is_bool() && Value::bool(true).as_bool());
        assert!(Value::bool(false).is_bool() && !Value::bool(false).as_bool());
    }

    #[test]
    fn tagged_variants_are_mutually_exclusive() {
        let values = [Value::undefined(), Value::null(), Value::empty(), Value::bool(true), Value::bool(false), Value::function(3)];
        for &v in &values {
            let flags = [v.is_undefined(), v.is_null(), v.is_empty(), v.is_bool(), v.is_number(), v.is_pointer(), v.is_function()];
            assert_eq!(flags.iter().filter(|&&f| f).count(), 1, "{v:?} matched more than one predicate");
        }
    }

    #[test]
    fn a_pointer_value_carries_its_address_through_the_tag() {
        let r = HeapRef::from_addr(0x1234_5678);
        let v = Value::object(r);
        assert!(v.is_object());
        assert_eq!(v.as_heap_ref(), r);
    }

    #[test]
    fn a_function_value_carries_its_index_through_the_tag() {
        let v = Value::function(7);
        assert!(v.is_function());
        assert!(!v.is_pointer());
        assert_eq!(v.as_function_index(), 7);
    }

    #[test]
    fn a_negative_nan_is_canonicalized_and_never_read_back_as_a_pointer() {
        let negative_nan = f64::from_bits(0xfff9_0000_0000_0001);
        assert!(negative_nan.is_nan());
        let v = Value::number(negative_nan);
        assert!(v.is_number());
        assert!(v.as_number().is_nan());
    }

    proptest! {
        #[test]
        fn any_finite_double_round_trips_as_a_number(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
            let v = Value::number(n);
            prop_assert!(v.is_number());
            prop_assert_eq!(v.as_number().to_bits(), n.to_bits());
        }

        #[test]
        fn any_48_bit_address_round_trips_through_a_string_ref(addr in 0u64..(1u64 << 48)) {
            let r = HeapRef::from_addr(addr as usize);
            let v = Value::string(r);
            prop_assert!(v.is_string());
            prop_assert_eq!(v.as_heap_ref().addr() as u64, addr);
        }
    }
}
