//! System Call Input Validation
//!
//! Every user pointer goes through here before the kernel reads or writes
//! through it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Null pointer dereference (explicit checks)
//!   - Kernel memory disclosure (user/kernel boundary on both range ends)
//!   - Unmapped access (every touched page is looked up)
//!   - Integer overflow (checked range arithmetic)
//!   - TOCTOU races (copy to kernel space before use)

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::handler::SyscallError;
use crate::config::MAX_USER_STRING;
use crate::mm::{pages_spanning, AddressSpace, PageFlags, VirtAddr};

/// A validated user-space buffer the kernel may read.
///
/// Only constructed by [`validate_user_read`], so holding one means every
/// page of the range was mapped and user-readable at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBuffer {
    addr: VirtAddr,
    len: usize,
}

impl UserBuffer {
    /// Start of the range.
    #[inline]
    pub fn addr(&self) -> VirtAddr {
        self.addr
    }

    /// Length of the range in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the range into a kernel-owned buffer.
    pub fn copy_in(&self, space: &dyn AddressSpace) -> Vec<u8> {
        let mut bytes = vec![0u8; self.len];
        if !self.is_empty() {
            space.copy_in(self, &mut bytes);
        }
        bytes
    }
}

/// A validated user-space buffer the kernel may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBufferMut {
    addr: VirtAddr,
    len: usize,
}

impl UserBufferMut {
    /// Start of the range.
    #[inline]
    pub fn addr(&self) -> VirtAddr {
        self.addr
    }

    /// Length of the range in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `data` to the start of the range.
    ///
    /// `data` longer than the range is truncated; the tail of the range is
    /// left untouched when `data` is shorter.
    pub fn copy_out(&self, space: &mut dyn AddressSpace, data: &[u8]) {
        if self.is_empty() || data.is_empty() {
            return;
        }
        let n = data.len().min(self.len);
        let head = UserBufferMut { addr: self.addr, len: n };
        space.copy_out(&head, &data[..n]);
    }
}

/// Check `[ptr, ptr + len)` against the caller's address space.
///
/// # Security Checks
/// 1. Pointer is not null
/// 2. Start and last byte are below the kernel boundary
/// 3. Range arithmetic doesn't overflow
/// 4. Every page from the start page through the last page is mapped with
///    at least `required`
///
/// A zero-length range still has its start page checked.
fn check_range(
    space: &dyn AddressSpace,
    ptr: usize,
    len: usize,
    required: PageFlags,
) -> Result<VirtAddr, SyscallError> {
    let start = VirtAddr::new(ptr);

    if start.is_null() || start.is_kernel() {
        return Err(SyscallError::Efault);
    }

    let last = start
        .checked_add(len.saturating_sub(1))
        .ok_or(SyscallError::Efault)?;
    if last.is_kernel() {
        return Err(SyscallError::Efault);
    }

    for page in pages_spanning(start, last) {
        match space.lookup(page) {
            Some(flags) if flags.contains(required) => {}
            _ => {
                log::debug!("[SYSCALL] page {} not accessible ({:?})", page, required);
                return Err(SyscallError::Efault);
            }
        }
    }

    Ok(start)
}

/// Validate a user-space buffer the kernel will read from.
pub fn validate_user_read(
    space: &dyn AddressSpace,
    ptr: usize,
    len: usize,
) -> Result<UserBuffer, SyscallError> {
    let addr = check_range(space, ptr, len, PageFlags::USER_READ)?;
    Ok(UserBuffer { addr, len })
}

/// Validate a user-space buffer the kernel will write into.
///
/// Same as read validation, plus every page must be writable.
pub fn validate_user_write(
    space: &dyn AddressSpace,
    ptr: usize,
    len: usize,
) -> Result<UserBufferMut, SyscallError> {
    let addr = check_range(space, ptr, len, PageFlags::USER_WRITE)?;
    Ok(UserBufferMut { addr, len })
}

/// Copy a NUL-terminated user string into the kernel.
///
/// The length isn't known up front, so the string is pulled one page at a
/// time and each page is validated before any byte of it is read.
///
/// # Errors
/// - `Efault` for a bad page or a string longer than `MAX_USER_STRING`
/// - `Einval` if the bytes are not UTF-8
pub fn read_user_string(space: &dyn AddressSpace, ptr: usize) -> Result<String, SyscallError> {
    let mut bytes = Vec::new();
    let mut cursor = VirtAddr::new(ptr);

    loop {
        // One byte of headroom so a NUL right at the limit is still seen.
        let budget = MAX_USER_STRING + 1 - bytes.len();
        let chunk_len = cursor.bytes_to_page_end().min(budget);
        let chunk = validate_user_read(space, cursor.as_usize(), chunk_len)?;
        let data = chunk.copy_in(space);

        if let Some(nul) = data.iter().position(|&b| b == 0) {
            bytes.extend_from_slice(&data[..nul]);
            break;
        }

        bytes.extend_from_slice(&data);
        if bytes.len() > MAX_USER_STRING {
            log::debug!("[SYSCALL] user string at {:#x} exceeds limit", ptr);
            return Err(SyscallError::Efault);
        }
        cursor = cursor.checked_add(chunk_len).ok_or(SyscallError::Efault)?;
    }

    String::from_utf8(bytes).map_err(|_| SyscallError::Einval)
}
