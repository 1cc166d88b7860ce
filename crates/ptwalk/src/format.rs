//! Page table format descriptions.
//!
//! A [`TableFormat`] names every bit-field the walker cares about: the index width of each
//! of the five levels, the page offset width, where an entry keeps its frame base, and which
//! entry bits decide presence and well-formedness. The walker itself holds no constants, so
//! the same descent serves any format that fits the five-level shape.

use core::fmt;

use crate::{FormatError, VirtualAddress};

/// Number of levels in every table format.
pub const LEVELS: usize = 5;

/// Size of a single table entry in bytes.
pub const ENTRY_SIZE: u64 = 8;

/// One level of the page table hierarchy, named after the directory it indexes.
///
/// Levels are numbered from the root: `Pgd` is level 0 and `Pte`, the leaf, is level 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Page global directory (root).
    Pgd = 0,
    /// Page 4th-level directory.
    P4d = 1,
    /// Page upper directory.
    Pud = 2,
    /// Page middle directory.
    Pmd = 3,
    /// Page table entry (leaf).
    Pte = 4,
}

impl Level {
    /// All levels in descent order.
    pub const ALL: [Level; LEVELS] = [Level::Pgd, Level::P4d, Level::Pud, Level::Pmd, Level::Pte];

    /// Returns the level number, 0 for the root through 4 for the leaf.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the level with the given number, if there is one.
    pub const fn from_index(index: usize) -> Option<Level> {
        match index {
            0 => Some(Level::Pgd),
            1 => Some(Level::P4d),
            2 => Some(Level::Pud),
            3 => Some(Level::Pmd),
            4 => Some(Level::Pte),
            _ => None,
        }
    }

    /// Returns whether this is the final level, whose entry maps a frame.
    #[inline]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Level::Pte)
    }

    /// Returns the short directory name for this level.
    pub const fn name(self) -> &'static str {
        match self {
            Level::Pgd => "PGD",
            Level::P4d => "P4D",
            Level::Pud => "PUD",
            Level::Pmd => "PMD",
            Level::Pte => "PTE",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit-field description of a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFormat {
    /// Width of this level's index field. Zero marks a folded level.
    index_bits: u32,
    /// An entry counts as present when any of these bits is set.
    present_mask: u64,
    /// Bits that must be clear for an entry to be well-formed.
    reserved_mask: u64,
}

impl LevelFormat {
    /// Creates a level with the given index width and entry masks.
    pub const fn new(index_bits: u32, present_mask: u64, reserved_mask: u64) -> Self {
        Self {
            index_bits,
            present_mask,
            reserved_mask,
        }
    }

    /// Creates a folded level.
    ///
    /// A folded level has no table of its own: it shares its parent's entry, so the walker
    /// reads nothing for it and it never fails validation.
    pub const fn folded() -> Self {
        Self::new(0, 0, 0)
    }

    /// Returns the width of the index field.
    #[inline]
    pub const fn index_bits(&self) -> u32 {
        self.index_bits
    }

    /// Returns the presence mask.
    #[inline]
    pub const fn present_mask(&self) -> u64 {
        self.present_mask
    }

    /// Returns the reserved-bit mask.
    #[inline]
    pub const fn reserved_mask(&self) -> u64 {
        self.reserved_mask
    }

    /// Returns whether this level is folded into its parent.
    #[inline]
    pub const fn is_folded(&self) -> bool {
        self.index_bits == 0
    }

    /// Returns the number of entries in a table at this level.
    #[inline]
    pub const fn entries(&self) -> usize {
        1 << self.index_bits
    }
}

/// Complete description of a five-level page table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    levels: [LevelFormat; LEVELS],
    /// Right shift that brings each level's index field to bit 0.
    shifts: [u32; LEVELS],
    offset_bits: u32,
    frame_mask: u64,
    page_present_mask: u64,
    table_flags: u64,
}

/// x86_64 entry bits shared by both paging modes.
mod x86 {
    pub const PRESENT: u64 = 1 << 0;
    pub const WRITABLE: u64 = 1 << 1;
    pub const USER: u64 = 1 << 2;
    pub const ACCESSED: u64 = 1 << 5;
    pub const DIRTY: u64 = 1 << 6;
    pub const PROT_NONE: u64 = 1 << 8;
    pub const NO_EXECUTE: u64 = 1 << 63;

    pub const FRAME_MASK: u64 = 0x000F_FFFF_FFFF_F000;
    pub const TABLE_FLAGS: u64 = PRESENT | WRITABLE | USER | ACCESSED | DIRTY;

    /// Directory entries may only carry the table flags and NX; anything else,
    /// the huge-page bit included, makes the entry bad.
    pub const DIRECTORY_RESERVED: u64 = !(FRAME_MASK | TABLE_FLAGS | NO_EXECUTE);

    /// Hardware may set accessed/dirty on an otherwise empty leaf.
    pub const LEAF_POPULATED: u64 = !(ACCESSED | DIRTY);
    pub const PAGE_PRESENT: u64 = PRESENT | PROT_NONE;

    pub const DIRECTORY: super::LevelFormat = super::LevelFormat::new(9, PRESENT, DIRECTORY_RESERVED);
    pub const LEAF: super::LevelFormat = super::LevelFormat::new(9, LEAF_POPULATED, 0);
}

impl TableFormat {
    /// x86_64 with 5-level paging (LA57): 57-bit virtual addresses, 4 KiB pages.
    pub const X86_64_5LEVEL: TableFormat = TableFormat::from_parts(
        [x86::DIRECTORY, x86::DIRECTORY, x86::DIRECTORY, x86::DIRECTORY, x86::LEAF],
        12,
        x86::FRAME_MASK,
        x86::PAGE_PRESENT,
        x86::TABLE_FLAGS,
    );

    /// x86_64 with 4-level paging: 48-bit virtual addresses, P4D folded into the PGD.
    pub const X86_64_4LEVEL: TableFormat = TableFormat::from_parts(
        [
            x86::DIRECTORY,
            LevelFormat::folded(),
            x86::DIRECTORY,
            x86::DIRECTORY,
            x86::LEAF,
        ],
        12,
        x86::FRAME_MASK,
        x86::PAGE_PRESENT,
        x86::TABLE_FLAGS,
    );

    /// Creates a custom table format.
    ///
    /// `frame_mask` selects the entry bits holding an already-positioned frame base,
    /// `page_present_mask` gives page-present semantics at the leaf, and `table_flags`
    /// is the flag set a host writes into a freshly created directory entry.
    pub fn new(
        levels: [LevelFormat; LEVELS],
        offset_bits: u32,
        frame_mask: u64,
        page_present_mask: u64,
        table_flags: u64,
    ) -> Result<Self, FormatError> {
        if offset_bits == 0 {
            return Err(FormatError::ZeroOffset);
        }
        for level in [Level::Pgd, Level::Pte] {
            if levels[level.index()].is_folded() {
                return Err(FormatError::FoldedLevel { level });
            }
        }

        let bits = levels
            .iter()
            .fold(offset_bits, |total, level| total.saturating_add(level.index_bits));
        if bits > u64::BITS {
            return Err(FormatError::AddressTooWide { bits });
        }

        let offset_mask = (1u64 << offset_bits) - 1;
        if frame_mask & offset_mask != 0 {
            return Err(FormatError::MisalignedFrameMask);
        }

        Ok(Self::from_parts(
            levels,
            offset_bits,
            frame_mask,
            page_present_mask,
            table_flags,
        ))
    }

    /// Builds a format without validation; callers guarantee the widths fit in 64 bits.
    const fn from_parts(
        levels: [LevelFormat; LEVELS],
        offset_bits: u32,
        frame_mask: u64,
        page_present_mask: u64,
        table_flags: u64,
    ) -> Self {
        let mut shifts = [0; LEVELS];
        let mut shift = offset_bits;
        let mut i = LEVELS;
        while i > 0 {
            i -= 1;
            shifts[i] = shift;
            shift += levels[i].index_bits;
        }

        Self {
            levels,
            shifts,
            offset_bits,
            frame_mask,
            page_present_mask,
            table_flags,
        }
    }

    /// Returns the description of a single level.
    #[inline]
    pub const fn level(&self, level: Level) -> &LevelFormat {
        &self.levels[level.index()]
    }

    /// Returns the bit position where the given level's index field starts.
    #[inline]
    pub const fn shift(&self, level: Level) -> u32 {
        self.shifts[level.index()]
    }

    /// Returns the index into the given level's table for a virtual address.
    ///
    /// The result is always below [`LevelFormat::entries`]. Folded levels always index 0.
    #[inline]
    pub const fn index(&self, level: Level, addr: VirtualAddress) -> usize {
        let bits = self.levels[level.index()].index_bits;
        if bits == 0 {
            return 0;
        }
        ((addr.as_u64() >> self.shifts[level.index()]) & ((1 << bits) - 1)) as usize
    }

    /// Returns the offset of a virtual address within its page.
    #[inline]
    pub const fn page_offset(&self, addr: VirtualAddress) -> u64 {
        addr.as_u64() & (self.page_size() - 1)
    }

    /// Returns the width of the page offset field.
    #[inline]
    pub const fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Returns the page size in bytes.
    #[inline]
    pub const fn page_size(&self) -> u64 {
        1 << self.offset_bits
    }

    /// Returns the entry bits holding the frame base.
    #[inline]
    pub const fn frame_mask(&self) -> u64 {
        self.frame_mask
    }

    /// Returns the leaf bits that give page-present semantics.
    #[inline]
    pub const fn page_present_mask(&self) -> u64 {
        self.page_present_mask
    }

    /// Returns the flags used for newly created directory entries.
    #[inline]
    pub const fn table_flags(&self) -> u64 {
        self.table_flags
    }

    /// Returns the number of virtual address bits the format translates.
    pub const fn virtual_bits(&self) -> u32 {
        self.shifts[0] + self.levels[0].index_bits
    }

    /// Returns whether the bits above the translated range sign-extend the top translated bit.
    pub const fn is_canonical(&self, addr: VirtualAddress) -> bool {
        self.canonicalize(addr).as_u64() == addr.as_u64()
    }

    /// Sign-extends the top translated bit into the unused high-order bits.
    pub const fn canonicalize(&self, addr: VirtualAddress) -> VirtualAddress {
        let bits = self.virtual_bits();
        if bits >= u64::BITS {
            return addr;
        }
        let unused = u64::BITS - bits;
        VirtualAddress::new((((addr.as_u64() << unused) as i64) >> unused) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod level {
        use super::*;

        #[test]
        fn descent_order() {
            for (i, level) in Level::ALL.iter().enumerate() {
                assert_eq!(level.index(), i);
                assert_eq!(Level::from_index(i), Some(*level));
            }
            assert_eq!(Level::from_index(LEVELS), None);
        }

        #[test]
        fn only_pte_is_leaf() {
            let leaves: Vec<_> = Level::ALL.iter().filter(|l| l.is_leaf()).collect();
            assert_eq!(leaves, [&Level::Pte]);
        }

        #[test]
        fn display_names() {
            assert_eq!(format!("{}", Level::Pgd), "PGD");
            assert_eq!(format!("{}", Level::Pud), "PUD");
        }
    }

    mod presets {
        use super::*;

        #[test]
        fn five_level_shifts() {
            let format = TableFormat::X86_64_5LEVEL;
            assert_eq!(format.shift(Level::Pte), 12);
            assert_eq!(format.shift(Level::Pmd), 21);
            assert_eq!(format.shift(Level::Pud), 30);
            assert_eq!(format.shift(Level::P4d), 39);
            assert_eq!(format.shift(Level::Pgd), 48);
            assert_eq!(format.virtual_bits(), 57);
            assert_eq!(format.offset_bits(), 12);
            assert_eq!(format.page_size(), 4096);
        }

        #[test]
        fn four_level_folds_p4d() {
            let format = TableFormat::X86_64_4LEVEL;
            assert!(format.level(Level::P4d).is_folded());
            assert_eq!(format.level(Level::P4d).entries(), 1);
            assert_eq!(format.shift(Level::Pgd), 39);
            assert_eq!(format.virtual_bits(), 48);
        }

        #[test]
        fn huge_page_bit_is_reserved_in_directories() {
            let format = TableFormat::X86_64_5LEVEL;
            for level in [Level::Pgd, Level::P4d, Level::Pud, Level::Pmd] {
                assert_ne!(format.level(level).reserved_mask() & (1 << 7), 0);
                assert_eq!(format.level(level).reserved_mask() & format.table_flags(), 0);
                assert_eq!(format.level(level).reserved_mask() & format.frame_mask(), 0);
            }
            assert_eq!(format.level(Level::Pte).reserved_mask(), 0);
        }
    }

    mod indexing {
        use super::*;

        #[test]
        fn splits_address_into_fields() {
            let format = TableFormat::X86_64_5LEVEL;
            let addr = VirtualAddress::new(
                (3 << 48) | (4 << 39) | (5 << 30) | (6 << 21) | (7 << 12) | 0x067,
            );
            assert_eq!(format.index(Level::Pgd, addr), 3);
            assert_eq!(format.index(Level::P4d, addr), 4);
            assert_eq!(format.index(Level::Pud, addr), 5);
            assert_eq!(format.index(Level::Pmd, addr), 6);
            assert_eq!(format.index(Level::Pte, addr), 7);
            assert_eq!(format.page_offset(addr), 0x067);
        }

        #[test]
        fn extreme_addresses_stay_in_bounds() {
            for format in [TableFormat::X86_64_5LEVEL, TableFormat::X86_64_4LEVEL] {
                for addr in [VirtualAddress::new(0), VirtualAddress::new(u64::MAX)] {
                    for level in Level::ALL {
                        assert!(format.index(level, addr) < format.level(level).entries());
                    }
                    assert!(format.page_offset(addr) < format.page_size());
                }
            }
        }

        #[test]
        fn max_address_indexes_last_slot() {
            let format = TableFormat::X86_64_5LEVEL;
            let addr = VirtualAddress::new(u64::MAX);
            for level in Level::ALL {
                assert_eq!(format.index(level, addr), 511);
            }
            assert_eq!(TableFormat::X86_64_4LEVEL.index(Level::P4d, addr), 0);
        }
    }

    mod canonical {
        use super::*;

        #[test]
        fn four_level_boundaries() {
            let format = TableFormat::X86_64_4LEVEL;
            assert!(format.is_canonical(VirtualAddress::new(0x0000_7FFF_FFFF_FFFF)));
            assert!(format.is_canonical(VirtualAddress::new(0xFFFF_8000_0000_0000)));
            assert!(!format.is_canonical(VirtualAddress::new(0x0000_8000_0000_0000)));
            assert!(!format.is_canonical(VirtualAddress::new(0xFFFF_7FFF_FFFF_FFFF)));
        }

        #[test]
        fn canonicalize_sign_extends() {
            let format = TableFormat::X86_64_4LEVEL;
            assert_eq!(
                format.canonicalize(VirtualAddress::new(0x0000_8000_0000_1000)),
                VirtualAddress::new(0xFFFF_8000_0000_1000)
            );
            assert_eq!(
                format.canonicalize(VirtualAddress::new(0x1234_0000_0000_1000)),
                VirtualAddress::new(0x1000)
            );
        }

        #[test]
        fn five_level_boundary() {
            let format = TableFormat::X86_64_5LEVEL;
            assert!(format.is_canonical(VirtualAddress::new(0x00FF_FFFF_FFFF_FFFF)));
            assert!(format.is_canonical(VirtualAddress::new(0xFF00_0000_0000_0000)));
            assert!(!format.is_canonical(VirtualAddress::new(0x0100_0000_0000_0000)));
        }
    }

    mod custom {
        use super::*;

        const DIR: LevelFormat = LevelFormat::new(9, 1, 0);

        #[test]
        fn accepts_valid_format() {
            let format = TableFormat::new([DIR; LEVELS], 12, 0x000F_FFFF_FFFF_F000, 1, 1).unwrap();
            assert_eq!(format.virtual_bits(), 57);
            assert_eq!(format.index(Level::Pte, VirtualAddress::new(0x3000)), 3);
        }

        #[test]
        fn small_scale_model() {
            // 16-bit address space: 4-bit page offset, 2-bit and 3-bit indices.
            let levels = [
                LevelFormat::new(3, 1, 0),
                LevelFormat::new(2, 1, 0),
                LevelFormat::folded(),
                LevelFormat::new(3, 1, 0),
                LevelFormat::new(4, 1, 0),
            ];
            let format = TableFormat::new(levels, 4, 0xFFF0, 1, 1).unwrap();
            assert_eq!(format.virtual_bits(), 16);
            let addr = VirtualAddress::new(0b101_10_011_1100_0110);
            assert_eq!(format.index(Level::Pgd, addr), 0b101);
            assert_eq!(format.index(Level::P4d, addr), 0b10);
            assert_eq!(format.index(Level::Pud, addr), 0);
            assert_eq!(format.index(Level::Pmd, addr), 0b011);
            assert_eq!(format.index(Level::Pte, addr), 0b1100);
            assert_eq!(format.page_offset(addr), 0b0110);
        }

        #[test]
        fn rejects_zero_offset() {
            let result = TableFormat::new([DIR; LEVELS], 0, 0xFFFF_F000, 1, 1);
            assert_eq!(result, Err(FormatError::ZeroOffset));
        }

        #[test]
        fn rejects_folded_root_and_leaf() {
            let mut levels = [DIR; LEVELS];
            levels[0] = LevelFormat::folded();
            assert_eq!(
                TableFormat::new(levels, 12, 0xFFFF_F000, 1, 1),
                Err(FormatError::FoldedLevel { level: Level::Pgd })
            );

            let mut levels = [DIR; LEVELS];
            levels[4] = LevelFormat::folded();
            assert_eq!(
                TableFormat::new(levels, 12, 0xFFFF_F000, 1, 1),
                Err(FormatError::FoldedLevel { level: Level::Pte })
            );
        }

        #[test]
        fn rejects_too_wide() {
            let levels = [LevelFormat::new(11, 1, 0); LEVELS];
            assert_eq!(
                TableFormat::new(levels, 12, 0xFFFF_F000, 1, 1),
                Err(FormatError::AddressTooWide { bits: 67 })
            );
        }

        #[test]
        fn rejects_frame_mask_overlapping_offset() {
            assert_eq!(
                TableFormat::new([DIR; LEVELS], 12, 0xFFFF_F800, 1, 1),
                Err(FormatError::MisalignedFrameMask)
            );
        }
    }
}
