//! Address types for the two sides of a translation.
//!
//! Both types are plain 64-bit newtypes. Neither carries a table format, so neither
//! validates on construction: what counts as canonical, how wide a frame may be and where
//! the page offset ends are all properties of a [`TableFormat`](crate::TableFormat).

use core::fmt;
use core::ops::Add;

/// Macro to define common address type functionality.
///
/// This macro generates the basic structure and methods common to both physical
/// and virtual address types, reducing code duplication.
macro_rules! impl_address_common {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new address.
            #[inline]
            pub const fn new(addr: u64) -> Self {
                Self(addr)
            }

            /// Returns the raw address value.
            #[inline]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Checks if the address is aligned to the given alignment.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn is_aligned(self, align: u64) -> bool {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                self.0 & (align - 1) == 0
            }

            /// Aligns the address down to the given alignment.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn align_down(self, align: u64) -> Self {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                Self(self.0 & !(align - 1))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(addr: u64) -> Self {
                Self::new(addr)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(addr: $name) -> Self {
                addr.0
            }
        }

        impl Add<u64> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: u64) -> Self::Output {
                Self::new(self.0 + rhs)
            }
        }
    };
}

impl_address_common!(
    PhysicalAddress,
    "A physical memory address.\n\n\
     Produced by a successful translation, and also used for the bases of the page\n\
     tables themselves, which the host stores as physical frame addresses."
);

impl_address_common!(
    VirtualAddress,
    "A virtual memory address.\n\n\
     The address being translated. How its bits split into level indices and a page\n\
     offset is decided by the table format of the address space it is walked in."
);
