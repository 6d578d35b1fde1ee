//! Address Space Collaborator
//!
//! The VM module owns page tables; the syscall layer only asks it two
//! things: is this page mapped (and how), and please move these bytes
//! across a range that has already been validated.

use alloc::boxed::Box;

use bitflags::bitflags;

use super::address::VirtAddr;
use crate::syscall::{UserBuffer, UserBufferMut};

bitflags! {
    /// Mapping attributes reported by a page-table lookup.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PageFlags: u8 {
        /// Page is present in memory.
        const PRESENT = 1 << 0;
        /// User code may write the page.
        const WRITABLE = 1 << 1;
        /// Page is reachable from user mode.
        const USER = 1 << 2;
    }
}

impl PageFlags {
    /// Minimum attributes for the kernel to read a page on a user's behalf.
    pub const USER_READ: Self = Self::PRESENT.union(Self::USER);
    /// Minimum attributes for the kernel to write a page on a user's behalf.
    pub const USER_WRITE: Self = Self::USER_READ.union(Self::WRITABLE);
}

/// One process's user address space.
///
/// Implementations are the only code that turns user addresses into
/// memory accesses. `copy_in`/`copy_out` are handed validated buffers
/// only, so they may assume every page in range is mapped.
pub trait AddressSpace: Send {
    /// Look up the page whose base is `page`.
    ///
    /// Returns `None` if nothing is mapped there.
    fn lookup(&self, page: VirtAddr) -> Option<PageFlags>;

    /// Copy `src.len()` bytes of user memory into `dst`.
    fn copy_in(&self, src: &UserBuffer, dst: &mut [u8]);

    /// Copy `src` into user memory at `dst`.
    fn copy_out(&mut self, dst: &UserBufferMut, src: &[u8]);

    /// Make an independent copy for a forked child.
    ///
    /// Returns `None` when memory for the copy cannot be allocated.
    fn duplicate(&self) -> Option<Box<dyn AddressSpace>>;
}
