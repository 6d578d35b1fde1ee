//! Filesystem interface for the syscall layer
//!
//! The on-disk filesystem is a collaborator. This module defines the
//! contract it must meet, the per-process descriptor table that owns its
//! open-file handles, and the single lock that serializes every call into it.
//!
//! # Design
//! - `FileSystem` covers path operations (create, remove, open)
//! - `File` is an open handle with its own cursor
//! - `FdTable` owns handles by small integer slot
//! - `FsLock` is taken around every collaborator call, console I/O excluded

use alloc::boxed::Box;

pub mod fdt;
pub mod lock;

pub use fdt::{Descriptor, Fd, FdTable, FdtError, STDIN_FILENO, STDOUT_FILENO};
pub use lock::FsLock;

/// Path-level operations of the backing filesystem.
pub trait FileSystem: Send {
    /// Create `path` with `initial_size` zero bytes. False if it exists or
    /// can't be created.
    fn create(&self, path: &str, initial_size: u32) -> bool;

    /// Remove `path`. False if it doesn't exist.
    fn remove(&self, path: &str) -> bool;

    /// Open `path` with its cursor at 0.
    fn open(&self, path: &str) -> Option<Box<dyn File>>;
}

/// An open file handle.
///
/// Every method is a collaborator call and must only run under the
/// [`FsLock`].
pub trait File: Send {
    /// Read from the cursor, advancing it. Returns bytes read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write at the cursor, advancing it. Returns bytes written.
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Move the cursor.
    fn seek(&mut self, pos: u32);

    /// Current cursor position.
    fn tell(&self) -> u32;

    /// Length of the underlying file in bytes.
    fn length(&self) -> u32;

    /// Open a second handle on the same file, with its own cursor starting
    /// where this one is.
    fn duplicate(&self) -> Option<Box<dyn File>>;

    /// Close the handle.
    fn close(self: Box<Self>);
}
