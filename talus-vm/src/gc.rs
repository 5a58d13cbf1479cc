//! Stop-the-world mark-sweep. The interpreter does not run while a
//! collection is in progress (§5's ordering guarantee), so there is no
//! need for incremental or concurrent bookkeeping beyond the mark bits
//! and card table the heap already maintains for a future collector.

use crate::heap::HeapRegionSpace;
use crate::objects::ObjectTable;
use crate::value::{HeapRef, Value};

/// Traces every object reachable from `roots`, marks it, then drops every
/// `ObjectTable` entry that was never reached. Returns the number of
/// objects collected.
pub fn collect(heap: &mut HeapRegionSpace, objects: &mut ObjectTable, roots: &[Value]) -> usize {
    for region in heap.regions_mut() {
        region.mark_bits.clear();
    }

    let mut worklist: Vec<HeapRef> = roots.iter().filter(|v| v.is_pointer()).map(|v| v.as_heap_ref()).collect();
    while let Some(addr) = worklist.pop() {
        let region = heap.region_containing_mut(addr.addr());
        if region.mark_bits.is_marked(addr.addr()) {
            continue;
        }
        region.mark_bits.mark(addr.addr());

        if let Some(object) = objects.get(addr) {
            worklist.extend(object.referents());
        }
    }

    let mut collected = 0;
    let dead: Vec<HeapRef> = objects
        .addresses()
        .filter(|&addr| !heap.region_containing_mut(addr.addr()).mark_bits.is_marked(addr.addr()))
        .collect();
    for addr in dead {
        objects.remove(addr);
        collected += 1;
    }

    for region in heap.regions_mut() {
        region.card_table.clear();
    }

    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Instance;
    use crate::objects::HeapObject;

    fn alloc_instance(heap: &mut HeapRegionSpace, objects: &mut ObjectTable, class: HeapRef) -> Value {
        let ptr = heap.alloc(8).unwrap();
        let addr = HeapRef::from_addr(ptr.as_ptr() as usize);
        objects.insert(addr, HeapObject::Instance(Instance::new(class, 0)));
        Value::object(addr)
    }

    fn alloc_class_ref(heap: &mut HeapRegionSpace) -> HeapRef {
        let ptr = heap.alloc(8).unwrap();
        HeapRef::from_addr(ptr.as_ptr() as usize)
    }

    #[test]
    fn an_object_unreachable_from_roots_is_collected() {
        let mut heap = HeapRegionSpace::new().unwrap();
        let mut objects = ObjectTable::new();
        let class = alloc_class_ref(&mut heap);
        let reachable = alloc_instance(&mut heap, &mut objects, class);
        let _unreachable = alloc_instance(&mut heap, &mut objects, class);

        assert_eq!(objects.len(), 2);
        let collected = collect(&mut heap, &mut objects, &[reachable]);
        assert_eq!(collected, 1);
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn a_chain_of_references_keeps_every_link_alive() {
        let mut heap = HeapRegionSpace::new().unwrap();
        let mut objects = ObjectTable::new();
        let class = alloc_class_ref(&mut heap);

        let tail = alloc_instance(&mut heap, &mut objects, class);
        let tail_ref = tail.as_heap_ref();
        let head_ptr = heap.alloc(8).unwrap();
        let head_addr = HeapRef::from_addr(head_ptr.as_ptr() as usize);
        let mut head = Instance::new(class, 1);
        head.fields[0] = Value::object(tail_ref);
        objects.insert(head_addr, HeapObject::Instance(head));

        let collected = collect(&mut heap, &mut objects, &[Value::object(head_addr)]);
        assert_eq!(collected, 0);
        assert_eq!(objects.len(), 2);
    }
}
