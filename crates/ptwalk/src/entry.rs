//! Raw page table entries.

use core::fmt;

use crate::{LevelFormat, PhysicalAddress, TableFormat};

/// A single page table entry as read from table memory.
///
/// An entry is just 64 bits. Whether it is present, well-formed or page-present depends
/// on the level it was read from and the table format, so every predicate takes the
/// relevant description.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct TableEntry(u64);

impl TableEntry {
    /// Creates an entry pointing at `frame` with the given flag bits.
    ///
    /// Bits of `frame` outside the format's frame mask are dropped, as are bits of `flags`
    /// inside it.
    pub fn new(frame: PhysicalAddress, flags: u64, format: &TableFormat) -> Self {
        debug_assert!(
            frame.as_u64() & !format.frame_mask() == 0,
            "frame base must fit the frame mask"
        );

        let frame_bits = frame.as_u64() & format.frame_mask();
        let flag_bits = flags & !format.frame_mask();
        Self(frame_bits | flag_bits)
    }

    /// Creates an entry from its raw bit pattern.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw bit pattern.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns whether all bits are clear.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns whether the entry is present at a level with this description.
    #[inline]
    pub const fn is_present(self, level: &LevelFormat) -> bool {
        self.0 & level.present_mask() != 0
    }

    /// Returns whether no reserved bits are set for a level with this description.
    #[inline]
    pub const fn is_well_formed(self, level: &LevelFormat) -> bool {
        self.0 & level.reserved_mask() == 0
    }

    /// Returns whether a leaf entry maps a resident page.
    #[inline]
    pub const fn is_page_present(self, format: &TableFormat) -> bool {
        self.0 & format.page_present_mask() != 0
    }

    /// Returns the frame base held by this entry.
    ///
    /// For a directory entry this is the physical base of the next table. For a leaf it is
    /// the base of the mapped frame.
    #[inline]
    pub const fn frame(self, format: &TableFormat) -> PhysicalAddress {
        PhysicalAddress::new(self.0 & format.frame_mask())
    }

    /// Returns the entry with the bits in `mask` cleared.
    #[inline]
    pub const fn without(self, mask: u64) -> Self {
        Self(self.0 & !mask)
    }

    /// Returns the entry with the bits in `mask` set.
    #[inline]
    pub const fn with(self, mask: u64) -> Self {
        Self(self.0 | mask)
    }
}

impl fmt::Debug for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableEntry({:#018x})", self.0)
    }
}

impl From<u64> for TableEntry {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<TableEntry> for u64 {
    fn from(entry: TableEntry) -> Self {
        entry.0
    }
}
