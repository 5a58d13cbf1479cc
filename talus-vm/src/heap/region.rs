//! A contiguous, size-aligned chunk of heap memory: `[CardTable | MarkBitSet
//! | AllocationArea]`. The alignment equals the region size, so any
//! interior pointer's owning region is recoverable by masking off the low
//! bits — no side table from address to region is needed.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::heap::card_table::CardTable;
use crate::heap::mark_bits::MarkBitSet;

pub const KB: usize = 1024;
pub const REGION_SIZE: usize = 4096 * KB;
pub const HEAP_ALIGN: usize = 8;

pub struct HeapRegion {
    storage: NonNull<u8>,
    layout: Layout,
    allocation_start: usize,
    top: usize,
    end: usize,
    pub card_table: CardTable,
    pub mark_bits: MarkBitSet,
}

impl HeapRegion {
    /// Maps a fresh region from the system allocator, aligned to its own
    /// size. Returns `None` on allocator failure (the caller turns that
    /// into a fatal out-of-memory condition).
    pub fn acquire() -> Option<HeapRegion> {
        let layout = Layout::from_size_align(REGION_SIZE, REGION_SIZE).expect("region size/align are fixed constants");
        let storage = NonNull::new(unsafe { alloc::alloc(layout) })?;

        let base = storage.as_ptr() as usize;
        // Metadata lives at the front of the region; everything after it
        // is fair game for bump allocation.
        let metadata_size = std::mem::size_of::<usize>() * 2; // placeholder footprint, real sizing below
        let _ = metadata_size;
        let allocation_start = base + std::mem::size_of::<CardTable>() + std::mem::size_of::<MarkBitSet>();
        let allocation_start = (allocation_start + HEAP_ALIGN - 1) & !(HEAP_ALIGN - 1);
        let allocation_area_size = base + REGION_SIZE - allocation_start;

        Some(HeapRegion {
            storage,
            layout,
            allocation_start,
            top: allocation_start,
            end: base + REGION_SIZE,
            card_table: CardTable::new(allocation_start, allocation_area_size),
            mark_bits: MarkBitSet::new(allocation_start, allocation_area_size),
        })
    }

    /// Returns the base address of the region containing `addr`, by
    /// masking off the low `log2(REGION_SIZE)` bits.
    pub fn start_of(addr: usize) -> usize {
        addr & !(REGION_SIZE - 1)
    }

    pub fn base(&self) -> usize {
        self.storage.as_ptr() as usize
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn allocation_start(&self) -> usize {
        self.allocation_start
    }

    /// Bump-allocates `size_aligned` bytes, already rounded up to
    /// `HEAP_ALIGN`. Returns `None` if the region is full.
    pub fn alloc(&mut self, size_aligned: usize) -> Option<NonNull<u8>> {
        debug_assert_eq!(size_aligned % HEAP_ALIGN, 0, "allocation size must be heap-aligned");
        let new_top = self.top.checked_add(size_aligned)?;
        if new_top > self.end {
            return None;
        }
        let ptr = self.top as *mut u8;
        self.top = new_top;
        NonNull::new(ptr)
    }

    /// Resets `top` back to the start of the allocation area, discarding
    /// every object in the region. Used after a full sweep determines
    /// nothing in the region survived.
    pub fn reset(&mut self) {
        self.top = self.allocation_start;
        self.card_table.clear();
        self.mark_bits.clear();
    }
}

impl Drop for HeapRegion {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.storage.as_ptr(), self.layout) }
    }
}
