//! x86_64 support: reading the live root table from the control registers.

use x86_64::registers::control::{Cr3, Cr4, Cr4Flags};

use crate::{AddressSpace, PhysicalAddress, TableFormat};

/// Returns the table format the processor is currently using.
///
/// Must run at CPL 0; reading CR4 from user mode faults.
pub fn active_format() -> TableFormat {
    if Cr4::read().contains(Cr4Flags::L5_PAGING) {
        TableFormat::X86_64_5LEVEL
    } else {
        TableFormat::X86_64_4LEVEL
    }
}

/// Returns a handle to the address space loaded in CR3.
///
/// Must run at CPL 0; reading CR3 from user mode faults.
pub fn active_address_space() -> AddressSpace {
    let (frame, _) = Cr3::read();
    let root = PhysicalAddress::new(frame.start_address().as_u64());
    AddressSpace::new(root, active_format())
}
