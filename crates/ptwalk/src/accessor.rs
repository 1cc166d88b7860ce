//! Read access to page table memory.
//!
//! The walker never dereferences table memory itself. It asks a [`TableAccessor`] for the
//! entry at a slot, which lets the same walk run against live tables through
//! [`DirectMap`] or against synthetic tables in tests.

use crate::{PhysicalAddress, TableEntry, format::ENTRY_SIZE};

/// Capability to read a single page table slot.
///
/// Implementations only read. The walker holds no locks, so keeping the tables alive and
/// unchanged for the duration of a walk is up to whoever owns them.
pub trait TableAccessor {
    /// Reads the entry at `index` in the table whose physical base is `table`.
    fn read_entry(&self, table: PhysicalAddress, index: usize) -> TableEntry;
}

impl<A: TableAccessor + ?Sized> TableAccessor for &A {
    fn read_entry(&self, table: PhysicalAddress, index: usize) -> TableEntry {
        (**self).read_entry(table, index)
    }
}

/// Returns the physical address of a slot within a table.
///
/// The table base comes from whatever the previous entry held, so the sum wraps instead of
/// overflowing.
#[inline]
pub const fn slot_address(table: PhysicalAddress, index: usize) -> PhysicalAddress {
    PhysicalAddress::new(
        table
            .as_u64()
            .wrapping_add((index as u64).wrapping_mul(ENTRY_SIZE)),
    )
}

/// Reads live tables through a linear mapping of all physical memory.
///
/// Physical address `p` is readable at virtual address `p + offset`, the layout kernels
/// call the direct map (or HHDM).
#[derive(Debug, Clone, Copy)]
pub struct DirectMap {
    offset: u64,
}

impl DirectMap {
    /// Creates an accessor for a direct map at the given virtual offset.
    ///
    /// # Safety
    ///
    /// Every table reachable from the address spaces walked through this accessor must be
    /// mapped, readable and 8-byte aligned at `physical + offset`, and must stay so while
    /// walks are running.
    pub const unsafe fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Returns the virtual offset of the direct map.
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl TableAccessor for DirectMap {
    fn read_entry(&self, table: PhysicalAddress, index: usize) -> TableEntry {
        let virt = slot_address(table, index).as_u64().wrapping_add(self.offset);
        // SAFETY: The constructor's contract guarantees the slot is mapped and aligned.
        // The host may update entries concurrently (accessed/dirty bits), hence volatile.
        let raw = unsafe { core::ptr::read_volatile(virt as usize as *const u64) };
        TableEntry::from_raw(raw)
    }
}
