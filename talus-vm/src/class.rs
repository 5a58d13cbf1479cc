//! The managed object model: every heap object carries a `class` pointer
//! as its first field, and `Class` is itself a heap object whose own
//! `class` pointer eventually refers to its meta-class. Class *linking*
//! (building a `Class` by walking a declaration) is out of scope here —
//! tests and callers construct `Class` values directly, the way a linker
//! would after it ran.

use talus_ir::FuncId;
use talus_support::UniqueString;

use crate::value::{HeapRef, Value};

#[derive(Clone, Debug)]
pub struct FieldDescriptor<'a> {
    pub name: UniqueString<'a>,
    pub offset: u32,
}

#[derive(Clone, Debug)]
pub struct MethodDescriptor<'a> {
    pub name: UniqueString<'a>,
    pub func: FuncId,
}

/// A class: field/method layout plus the meta-class self-reference every
/// class must eventually carry. `super_class` and `meta_class` are
/// `None` only before `link` runs; after that, invariant (iii) of the
/// managed-heap data model holds (`meta_class` is always populated).
pub struct Class<'a> {
    pub super_class: Option<HeapRef>,
    pub fields: Vec<FieldDescriptor<'a>>,
    pub static_fields: Vec<Value>,
    pub methods: Vec<MethodDescriptor<'a>>,
    pub access_flags: u32,
    pub object_size: u32,
    meta_class: Option<HeapRef>,
}

impl<'a> Class<'a> {
    pub fn new(super_class: Option<HeapRef>, fields: Vec<FieldDescriptor<'a>>, methods: Vec<MethodDescriptor<'a>>) -> Class<'a> {
        let object_size = 8 + fields.len() as u32 * 8;
        Class { super_class, fields, static_fields: Vec::new(), methods, access_flags: 0, object_size, meta_class: None }
    }

    /// Points this class's own `class` pointer at `meta_class`, usually
    /// itself (a class is commonly its own meta-class's single instance
    /// in a system without a full metaclass hierarchy).
    pub fn link_meta_class(&mut self, meta_class: HeapRef) {
        self.meta_class = Some(meta_class);
    }

    pub fn meta_class(&self) -> Option<HeapRef> {
        self.meta_class
    }

    pub fn field_offset(&self, name: &str) -> Option<u32> {
        self.fields.iter().find(|f| f.name.as_str() == name).map(|f| f.offset)
    }

    pub fn method(&self, name: &str) -> Option<FuncId> {
        self.methods.iter().find(|m| m.name.as_str() == name).map(|m| m.func)
    }
}

/// A plain instance of some class: a `class` pointer plus its field
/// slots, addressed by the owning `Class`'s field descriptors.
pub struct Instance {
    pub class: HeapRef,
    pub fields: Vec<Value>,
}

impl Instance {
    pub fn new(class: HeapRef, field_count: usize) -> Instance {
        Instance { class, fields: vec![Value::undefined(); field_count] }
    }
}
