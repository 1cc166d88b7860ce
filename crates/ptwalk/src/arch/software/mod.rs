//! Software emulation of page table memory for testing and development.
//!
//! [`EmulatedMemory`] stands in for physical memory: a sparse store of 64-bit words with a
//! bump allocator for page tables. It implements [`TableAccessor`], so the walker runs
//! against it exactly as it would against live tables, and it counts every slot read so
//! tests can check how far a walk went.

use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::{
    AddressSpace, Level, PhysicalAddress, TableAccessor, TableEntry, TableFormat,
    VirtualAddress,
    accessor::slot_address,
    format::ENTRY_SIZE,
};

/// Emulated physical memory holding page tables.
///
/// Unwritten words read as zero. All methods take `&self`; the word store sits behind a
/// reader-writer lock so walkers on several threads can share one instance.
pub struct EmulatedMemory {
    /// Written words, keyed by physical address.
    words: spin::RwLock<BTreeMap<u64, u64>>,
    /// Next allocation offset (simple bump allocator).
    next_alloc: AtomicU64,
    /// End of the allocatable window.
    size: u64,
    /// Number of slot reads served through [`TableAccessor`].
    reads: AtomicUsize,
}

impl EmulatedMemory {
    /// Creates an emulated memory region of `size` bytes starting at physical address 0.
    pub fn new(size: u64) -> Self {
        Self {
            words: spin::RwLock::new(BTreeMap::new()),
            next_alloc: AtomicU64::new(0),
            size,
            reads: AtomicUsize::new(0),
        }
    }

    /// Returns the size of the emulated memory region.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Allocates a block of memory from the emulated space.
    ///
    /// Returns the physical address of the allocated block, or None if
    /// there's not enough space.
    pub fn allocate(&self, size: u64, align: u64) -> Option<PhysicalAddress> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        loop {
            let current = self.next_alloc.load(Ordering::Relaxed);

            let aligned = current.checked_add(align - 1)? & !(align - 1);
            let end = aligned.checked_add(size)?;
            if end > self.size {
                return None;
            }

            if self
                .next_alloc
                .compare_exchange(current, end, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return Some(PhysicalAddress::new(aligned));
            }
        }
    }

    /// Allocates a zeroed table large enough for any level of `format`.
    ///
    /// # Panics
    ///
    /// Panics if the emulated memory is exhausted.
    pub fn allocate_table(&self, format: &TableFormat) -> PhysicalAddress {
        let largest = Level::ALL
            .iter()
            .map(|&level| format.level(level).entries() as u64 * ENTRY_SIZE)
            .max()
            .unwrap_or(ENTRY_SIZE);
        let size = largest.next_multiple_of(format.page_size());

        self.allocate(size, format.page_size())
            .expect("out of emulated memory")
    }

    /// Creates an address space with a fresh, empty root table.
    pub fn new_address_space(&self, format: TableFormat) -> AddressSpace {
        AddressSpace::new(self.allocate_table(&format), format)
    }

    /// Reads a 64-bit word without counting it as a table read.
    pub fn read_u64(&self, addr: PhysicalAddress) -> u64 {
        self.words.read().get(&addr.as_u64()).copied().unwrap_or(0)
    }

    /// Writes a 64-bit word.
    pub fn write_u64(&self, addr: PhysicalAddress, value: u64) {
        let mut words = self.words.write();
        if value == 0 {
            words.remove(&addr.as_u64());
        } else {
            words.insert(addr.as_u64(), value);
        }
    }

    /// Returns the entry at a slot without counting it as a table read.
    pub fn entry(&self, table: PhysicalAddress, index: usize) -> TableEntry {
        TableEntry::from_raw(self.read_u64(slot_address(table, index)))
    }

    /// Overwrites the entry at a slot.
    pub fn write_entry(&self, table: PhysicalAddress, index: usize, entry: TableEntry) {
        self.write_u64(slot_address(table, index), entry.as_u64());
    }

    /// Returns how many slots have been read through [`TableAccessor`].
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Resets the read counter.
    pub fn reset_reads(&self) {
        self.reads.store(0, Ordering::Relaxed);
    }

    /// Installs `leaf` as the final-level entry for `addr`, creating directories as needed.
    ///
    /// New directory entries carry the format's table flags. Existing directory entries are
    /// reused if present, whatever else they hold.
    ///
    /// # Panics
    ///
    /// Panics if the emulated memory is exhausted.
    pub fn map(&self, space: &AddressSpace, addr: VirtualAddress, leaf: TableEntry) {
        let format = space.format();
        let mut table = space.root();

        for level in Level::ALL {
            let level_format = format.level(level);
            if level_format.is_folded() {
                continue;
            }

            let index = format.index(level, addr);
            if level.is_leaf() {
                self.write_entry(table, index, leaf);
                return;
            }

            let mut entry = self.entry(table, index);
            if !entry.is_present(level_format) {
                let next = self.allocate_table(format);
                entry = TableEntry::new(next, format.table_flags(), format);
                self.write_entry(table, index, entry);
            }
            table = entry.frame(format);
        }
    }

    /// Locates the slot that holds the entry for `addr` at `level`.
    ///
    /// A folded level resolves to its parent's slot. Returns None if a directory above
    /// `level` is not present.
    pub fn slot(
        &self,
        space: &AddressSpace,
        addr: VirtualAddress,
        level: Level,
    ) -> Option<(PhysicalAddress, usize)> {
        let format = space.format();
        let mut table = space.root();
        let mut slot = None;

        for current in &Level::ALL[..=level.index()] {
            let level_format = format.level(*current);
            if level_format.is_folded() {
                continue;
            }
            if let Some((parent, index)) = slot {
                let entry = self.entry(parent, index);
                if !entry.is_present(format.level(Self::owner(format, *current))) {
                    return None;
                }
                table = entry.frame(format);
            }
            slot = Some((table, format.index(*current, addr)));
        }

        slot
    }

    /// Returns the nearest non-folded level strictly above `level`.
    fn owner(format: &TableFormat, level: Level) -> Level {
        (0..level.index())
            .rev()
            .filter_map(Level::from_index)
            .find(|&above| !format.level(above).is_folded())
            .unwrap_or(Level::Pgd)
    }

    /// Updates the entry for `addr` at `level` in place.
    ///
    /// Returns false if the slot cannot be reached.
    pub fn update(
        &self,
        space: &AddressSpace,
        addr: VirtualAddress,
        level: Level,
        f: impl FnOnce(TableEntry) -> TableEntry,
    ) -> bool {
        match self.slot(space, addr, level) {
            Some((table, index)) => {
                let entry = self.entry(table, index);
                self.write_entry(table, index, f(entry));
                true
            }
            None => false,
        }
    }
}

impl TableAccessor for EmulatedMemory {
    fn read_entry(&self, table: PhysicalAddress, index: usize) -> TableEntry {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.entry(table, index)
    }
}
