//! User Virtual Address Type
//!
//! A newtype over raw user-supplied address words so they cannot be
//! confused with kernel pointers or lengths.
//!
//! # Security Properties
//! - Construction never rewrites the value; what the user passed is what
//!   gets checked
//! - Arithmetic is checked, an overflowing range is reported, not wrapped
//! - There is no conversion to a raw pointer

use core::fmt;

use crate::config::KERNEL_BASE;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
const PAGE_SHIFT: usize = 12;

/// A virtual address as seen by a user program.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Wrap a raw address word.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Get the page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Bytes from this address to the end of its page.
    #[inline]
    pub const fn bytes_to_page_end(self) -> usize {
        PAGE_SIZE - self.page_offset()
    }

    /// Add an offset, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Check if this is a kernel address.
    #[inline]
    pub const fn is_kernel(self) -> bool {
        self.0 >= KERNEL_BASE
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#018x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Iterate over the page bases of every page that `[start, last]` touches.
///
/// `last` is the address of the final byte, so a one-byte range yields one
/// page and a range ending exactly on a boundary does not spill over.
pub fn pages_spanning(start: VirtAddr, last: VirtAddr) -> impl Iterator<Item = VirtAddr> {
    (start.page_number()..=last.page_number()).map(|n| VirtAddr(n << PAGE_SHIFT))
}
