//! Address space handles.
//!
//! An [`AddressSpace`] names a set of page tables without owning them. The host creates,
//! switches and frees its tables; the walker only needs to know where the root table lives
//! and how the tables are laid out.

use crate::{PhysicalAddress, TableFormat};

/// A handle to a host-owned address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    /// Physical base of the root (PGD) table.
    root: PhysicalAddress,
    /// Layout of every table reachable from the root.
    format: TableFormat,
}

impl AddressSpace {
    /// Creates a handle for the tables rooted at `root`.
    pub const fn new(root: PhysicalAddress, format: TableFormat) -> Self {
        Self { root, format }
    }

    /// Returns the physical base of the root table.
    #[inline]
    pub const fn root(&self) -> PhysicalAddress {
        self.root
    }

    /// Returns the table format of this address space.
    #[inline]
    pub const fn format(&self) -> &TableFormat {
        &self.format
    }
}
