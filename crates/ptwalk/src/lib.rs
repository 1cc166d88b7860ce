#![cfg_attr(not(any(test, feature = "software-emulation")), no_std)]

//! # ptwalk
//!
//! A software page table walker. Given an address space and a virtual address, it
//! descends the five levels of the host's page tables and returns the physical address
//! the hardware would translate to, without relying on anything the hardware has cached.
//!
//! - [`Walker`] performs the walk over any [`TableAccessor`].
//! - [`TableFormat`] describes the table layout, with presets for x86_64.
//! - [`syscall`] wraps the walk in a one-address-in, one-address-out entry point.
//! - Software emulation of table memory for testing in non-kernel environments.

extern crate alloc;

mod accessor;
mod address;
mod address_space;
pub mod arch;
mod entry;
mod error;
mod format;
pub mod syscall;
mod walker;

pub use accessor::{DirectMap, TableAccessor, slot_address};
pub use address::{PhysicalAddress, VirtualAddress};
pub use address_space::AddressSpace;
pub use entry::TableEntry;
pub use error::{FormatError, TransferError, TranslationError};
pub use format::{ENTRY_SIZE, LEVELS, Level, LevelFormat, TableFormat};
pub use walker::{Translation, Walker};
