//! Build-time configuration
//!
//! Every tunable of the syscall layer lives here so the limits a user
//! program can run into are visible in one place.

use crate::mm::PAGE_SIZE;

/// Number of descriptor slots per process, including the two console slots.
pub const FDT_CAPACITY: usize = 128;

/// First kernel virtual address. Everything at or above is off-limits to
/// user pointers.
pub const KERNEL_BASE: usize = 0x80_0400_0000;

/// Longest user string (path, process name, command line) accepted, not
/// counting the terminating NUL.
pub const MAX_USER_STRING: usize = PAGE_SIZE;

/// Most words a command line may split into, program name included.
pub const MAX_ARGS: usize = 64;
