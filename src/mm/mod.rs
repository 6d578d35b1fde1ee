//! Memory management interface for the syscall layer
//!
//! Provides:
//! - Typed user virtual addresses and page arithmetic
//! - The address-space contract consumed from the VM module
//!
//! # Security Principles
//! - User addresses are never turned into kernel pointers here
//! - Only the address-space collaborator touches user memory

mod address;
mod space;

pub use address::{pages_spanning, VirtAddr, PAGE_SIZE};
pub use space::{AddressSpace, PageFlags};
