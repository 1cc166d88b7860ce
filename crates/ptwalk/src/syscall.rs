//! The callable entry point: one virtual address in, one physical address out.
//!
//! Everything outside the walk itself belongs to the host: which address space the caller
//! runs in, and how addresses cross between the caller's memory and ours. The host provides
//! those through [`Host`]; [`get_physical_address`] sequences them around the walk.

use crate::{
    AddressSpace, PhysicalAddress, TableAccessor, TransferError, TranslationError,
    VirtualAddress, Walker,
};

/// `EFAULT` ("bad address"), the single failure code the entry point reports.
pub const EFAULT: isize = 14;

/// Operations the host performs on the walker's behalf.
pub trait Host {
    /// Returns the address space of the calling process.
    fn resolve_current_address_space(&self) -> AddressSpace;

    /// Copies the virtual address to translate in from the caller.
    fn read_virtual_address_input(&self) -> Result<VirtualAddress, TransferError>;

    /// Copies the translated physical address out to the caller.
    fn write_physical_address_output(&mut self, addr: PhysicalAddress)
        -> Result<(), TransferError>;
}

/// Translates the caller's virtual address and hands the result back to the caller.
///
/// The input is copied in first, then the caller's address space is resolved and walked.
/// The output is written only if the walk succeeds. The first failure ends the call.
pub fn get_physical_address<H, A>(
    host: &mut H,
    accessor: A,
) -> Result<PhysicalAddress, TranslationError>
where
    H: Host + ?Sized,
    A: TableAccessor,
{
    let addr = host.read_virtual_address_input().map_err(|_| {
        log::error!("failed to copy virtual address from caller");
        TranslationError::InputTransferFailed
    })?;

    let space = host.resolve_current_address_space();
    let phys = Walker::new(accessor).translate(&space, addr).inspect_err(|err| {
        log::warn!("cannot translate {}: {}", addr, err);
    })?;

    host.write_physical_address_output(phys).map_err(|_| {
        log::error!("failed to copy physical address to caller");
        TranslationError::OutputTransferFailed
    })?;

    Ok(phys)
}

/// Maps an entry point result to its return code: `0` on success, `-EFAULT` on any error.
pub fn to_return_code<T>(result: &Result<T, TranslationError>) -> isize {
    match result {
        Ok(_) => 0,
        Err(_) => -EFAULT,
    }
}
