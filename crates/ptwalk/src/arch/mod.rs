//! Architecture-specific support for the walker.
//!
//! Nothing here is needed to walk tables: the walker only sees a [`TableFormat`] and a
//! [`TableAccessor`]. This module supplies ways to obtain those, either from the running
//! machine or from emulated memory.
//!
//! [`TableFormat`]: crate::TableFormat
//! [`TableAccessor`]: crate::TableAccessor

// Reading the live root needs the hardware registers of the target we are built for.
#[cfg(target_arch = "x86_64")]
pub mod x86_64;

// Use software emulation ONLY when:
// - Running tests, OR
// - software-emulation feature is explicitly enabled
#[cfg(any(test, feature = "software-emulation"))]
mod software;
#[cfg(any(test, feature = "software-emulation"))]
pub use software::EmulatedMemory;
