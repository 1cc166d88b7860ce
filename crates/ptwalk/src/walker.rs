//! The five-level page table walk.
//!
//! The walk descends from the root directory to the leaf, one level at a time, and stops
//! at the first entry that is absent or malformed. It only ever reads table memory, and
//! every read goes through the [`TableAccessor`] it was built with.

use crate::{
    AddressSpace, Level, PhysicalAddress, TableAccessor, TableEntry, TableFormat,
    TranslationError, VirtualAddress, format::LEVELS,
};

/// A successful translation together with the entries it passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    virtual_address: VirtualAddress,
    physical_address: PhysicalAddress,
    /// Entry observed at each level. A folded level repeats its parent's entry.
    entries: [TableEntry; LEVELS],
}

impl Translation {
    /// Returns the address that was translated.
    pub const fn virtual_address(&self) -> VirtualAddress {
        self.virtual_address
    }

    /// Returns the translated physical address.
    pub const fn physical_address(&self) -> PhysicalAddress {
        self.physical_address
    }

    /// Returns the entry the walk used at `level`.
    pub const fn entry(&self, level: Level) -> TableEntry {
        self.entries[level.index()]
    }

    /// Returns the leaf entry that maps the page.
    pub const fn leaf(&self) -> TableEntry {
        self.entries[Level::Pte.index()]
    }

    /// Returns the entries from the root down to the leaf.
    pub const fn entries(&self) -> &[TableEntry; LEVELS] {
        &self.entries
    }
}

/// Translates virtual addresses by walking page tables in software.
///
/// A walker holds nothing but its accessor, so walks are independent of each other and
/// may run on any number of threads at once when the accessor allows it.
#[derive(Debug, Clone, Copy)]
pub struct Walker<A> {
    accessor: A,
}

impl<A: TableAccessor> Walker<A> {
    /// Creates a walker that reads table memory through `accessor`.
    pub const fn new(accessor: A) -> Self {
        Self { accessor }
    }

    /// Returns the accessor this walker reads through.
    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// Translates `addr` in `space` to a physical address.
    ///
    /// Bits of `addr` above the format's translated range are ignored; callers that want
    /// non-canonical addresses rejected should check [`TableFormat::is_canonical`] first.
    pub fn translate(
        &self,
        space: &AddressSpace,
        addr: VirtualAddress,
    ) -> Result<PhysicalAddress, TranslationError> {
        self.walk(space, addr)
            .map(|translation| translation.physical_address())
    }

    /// Walks the tables of `space` for `addr`, returning the entries seen on the way.
    pub fn walk(
        &self,
        space: &AddressSpace,
        addr: VirtualAddress,
    ) -> Result<Translation, TranslationError> {
        let format = space.format();
        let mut entries = [TableEntry::default(); LEVELS];
        let mut table = space.root();
        let mut entry = TableEntry::default();

        for level in Level::ALL {
            // A folded level shares its parent's entry, which has already been checked.
            if format.level(level).is_folded() {
                entries[level.index()] = entry;
                continue;
            }

            let index = format.index(level, addr);
            entry = self.accessor.read_entry(table, index);
            entries[level.index()] = entry;
            log::trace!("{} {}[{}] = {:?}", level, table, index, entry);

            if let Err(err) = check(format, level, entry) {
                log::debug!("walk of {} stopped at {}: {}", addr, level, err);
                return Err(err);
            }

            table = entry.frame(format);
        }

        let physical_address =
            PhysicalAddress::new(entry.frame(format).as_u64() | format.page_offset(addr));
        log::trace!("{} -> {}", addr, physical_address);

        Ok(Translation {
            virtual_address: addr,
            physical_address,
            entries,
        })
    }
}

/// Validates the entry read at `level`.
fn check(format: &TableFormat, level: Level, entry: TableEntry) -> Result<(), TranslationError> {
    let level_format = format.level(level);

    if !entry.is_present(level_format) {
        return Err(TranslationError::LevelNotPresent { level });
    }
    if !entry.is_well_formed(level_format) {
        return Err(TranslationError::LevelMalformed { level });
    }
    if level.is_leaf() && !entry.is_page_present(format) {
        return Err(TranslationError::PageNotPresent);
    }

    Ok(())
}
