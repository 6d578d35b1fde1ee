//! File Descriptor Table
//!
//! A per-process table of open-file handles, indexed by descriptor number.
//!
//! # Design
//! - Fixed-size array of slots
//! - Slots 0 and 1 belong to the console and never hold a handle
//! - Allocation picks the lowest empty slot from 2 upward
//! - Releasing a slot closes its handle, it is never just forgotten

use alloc::boxed::Box;

use super::{File, FsLock};
use crate::config::FDT_CAPACITY;

/// Console input descriptor.
pub const STDIN_FILENO: i32 = 0;
/// Console output descriptor.
pub const STDOUT_FILENO: i32 = 1;

/// A descriptor number that can name a file slot.
///
/// This is a newtype to prevent using arbitrary integers as slot indices:
/// holding an `Fd` means the number is in `[2, FDT_CAPACITY)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// First descriptor available to files.
    pub const FIRST_FILE: Self = Self(2);

    /// Create a descriptor from a user-supplied number.
    ///
    /// Returns None for the console descriptors and anything out of range.
    #[inline]
    pub const fn new(raw: i32) -> Option<Self> {
        if raw >= Self::FIRST_FILE.0 as i32 && (raw as usize) < FDT_CAPACITY {
            Some(Self(raw as u32))
        } else {
            None
        }
    }

    /// Get the slot index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Descriptor number as returned to user code.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0 as i32
    }
}

/// What a user-supplied descriptor number refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Descriptor {
    Stdin,
    Stdout,
    File(Fd),
}

impl Descriptor {
    /// Sort a raw descriptor number into console or file.
    ///
    /// Returns None if it is neither.
    pub const fn classify(raw: i32) -> Option<Self> {
        match raw {
            STDIN_FILENO => Some(Self::Stdin),
            STDOUT_FILENO => Some(Self::Stdout),
            _ => match Fd::new(raw) {
                Some(fd) => Some(Self::File(fd)),
                None => None,
            },
        }
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtError {
    /// The number is negative, a console descriptor, or past the table.
    InvalidDescriptor,
    /// The slot holds no open file.
    SlotEmpty,
}

impl core::fmt::Display for FdtError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidDescriptor => write!(f, "invalid descriptor"),
            Self::SlotEmpty => write!(f, "descriptor is not open"),
        }
    }
}

/// Descriptor table for one process.
pub struct FdTable {
    /// Array of descriptor slots.
    slots: [Option<Box<dyn File>>; FDT_CAPACITY],
}

impl FdTable {
    /// Create a table with only the console descriptors.
    pub const fn new() -> Self {
        const EMPTY: Option<Box<dyn File>> = None;
        Self {
            slots: [EMPTY; FDT_CAPACITY],
        }
    }

    /// Find the lowest free file slot.
    pub fn find_free(&self) -> Option<Fd> {
        (Fd::FIRST_FILE.index()..FDT_CAPACITY)
            .find(|&i| self.slots[i].is_none())
            .map(|i| Fd(i as u32))
    }

    /// Install `file` in the lowest free slot.
    ///
    /// When the table is full the handle is given back so the caller can
    /// close it.
    pub fn allocate(&mut self, file: Box<dyn File>) -> Result<Fd, Box<dyn File>> {
        match self.find_free() {
            Some(fd) => {
                self.slots[fd.index()] = Some(file);
                Ok(fd)
            }
            None => Err(file),
        }
    }

    /// Look up the open file behind a raw descriptor number.
    pub fn lookup(&mut self, raw: i32) -> Result<&mut Box<dyn File>, FdtError> {
        let fd = Fd::new(raw).ok_or(FdtError::InvalidDescriptor)?;
        self.slots[fd.index()].as_mut().ok_or(FdtError::SlotEmpty)
    }

    /// Remove a handle from its slot without closing it.
    pub fn take(&mut self, raw: i32) -> Result<Box<dyn File>, FdtError> {
        let fd = Fd::new(raw).ok_or(FdtError::InvalidDescriptor)?;
        self.slots[fd.index()].take().ok_or(FdtError::SlotEmpty)
    }

    /// Clear a slot and close its handle.
    ///
    /// Console descriptors, out-of-range numbers and empty slots are left
    /// alone. Returns whether a handle was closed.
    pub fn release(&mut self, raw: i32, fs: &FsLock) -> bool {
        match self.take(raw) {
            Ok(file) => {
                fs.run(|_| file.close());
                true
            }
            Err(_) => false,
        }
    }

    /// Close every open handle. Returns how many were closed.
    pub fn close_all(&mut self, fs: &FsLock) -> usize {
        let mut closed = 0;
        fs.run(|_| {
            for slot in self.slots.iter_mut() {
                if let Some(file) = slot.take() {
                    file.close();
                    closed += 1;
                }
            }
        });
        closed
    }

    /// Copy the table for a forked child.
    ///
    /// Each handle is duplicated at the same descriptor number. If any
    /// duplication fails, the copies made so far are closed and None is
    /// returned; `self` is unchanged either way.
    pub fn duplicate(&self, fs: &FsLock) -> Option<FdTable> {
        fs.run(|_| {
            let mut copy = FdTable::new();
            for (i, slot) in self.slots.iter().enumerate() {
                let Some(file) = slot else { continue };
                match file.duplicate() {
                    Some(dup) => copy.slots[i] = Some(dup),
                    None => {
                        log::debug!("[FS] cannot duplicate descriptor {}", i);
                        for made in copy.slots.iter_mut().filter_map(Option::take) {
                            made.close();
                        }
                        return None;
                    }
                }
            }
            Some(copy)
        })
    }

    /// Number of open files.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Descriptor numbers currently open, in ascending order.
    pub fn open_fds(&self) -> impl Iterator<Item = Fd> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| Fd(i as u32))
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FdTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.open_fds().map(Fd::as_raw)).finish()
    }
}
