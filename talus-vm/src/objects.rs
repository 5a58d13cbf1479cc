//! Maps a heap address to the structured payload living there. Real
//! bytes are still reserved from a `HeapRegion`'s bump pointer for every
//! object — the region's `top`, its card table, and its mark bits all
//! track genuine addresses — but the object's own fields are kept here
//! rather than reinterpreted out of raw memory, so field access stays
//! within safe Rust.

use std::collections::HashMap;

use crate::class::{Class, Instance};
use crate::value::HeapRef;

pub enum HeapObject<'a> {
    Class(Class<'a>),
    Instance(Instance),
    Str(String),
}

impl<'a> HeapObject<'a> {
    /// Every `Value`-typed slot this object directly holds: a class
    /// pointer, instance fields, or (for a `Class`) its static fields and
    /// super/meta-class pointers packed as object values. The tracer
    /// walks these to find the next generation of reachable addresses.
    pub fn referents(&self) -> Vec<HeapRef> {
        match self {
            HeapObject::Class(class) => {
                let mut refs: Vec<HeapRef> = class.static_fields.iter().filter(|v| v.is_pointer()).map(|v| v.as_heap_ref()).collect();
                refs.extend(class.super_class);
                refs.extend(class.meta_class());
                refs
            }
            HeapObject::Instance(instance) => {
                let mut refs = vec![instance.class];
                refs.extend(instance.fields.iter().filter(|v| v.is_pointer()).map(|v| v.as_heap_ref()));
                refs
            }
            HeapObject::Str(_) => Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct ObjectTable<'a> {
    objects: HashMap<usize, HeapObject<'a>>,
}

impl<'a> ObjectTable<'a> {
    pub fn new() -> ObjectTable<'a> {
        ObjectTable { objects: HashMap::new() }
    }

    pub fn insert(&mut self, addr: HeapRef, object: HeapObject<'a>) {
        self.objects.insert(addr.addr(), object);
    }

    pub fn get(&self, addr: HeapRef) -> Option<&HeapObject<'a>> {
        self.objects.get(&addr.addr())
    }

    pub fn get_mut(&mut self, addr: HeapRef) -> Option<&mut HeapObject<'a>> {
        self.objects.get_mut(&addr.addr())
    }

    pub fn remove(&mut self, addr: HeapRef) {
        self.objects.remove(&addr.addr());
    }

    pub fn addresses(&self) -> impl Iterator<Item = HeapRef> + '_ {
        self.objects.keys().copied().map(HeapRef::from_addr)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
