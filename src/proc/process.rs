//! Process control block
//!
//! The per-process resources the syscall layer owns: name, address space
//! and descriptor table. Relationships (parent, children, exit status) live
//! in the [`ProcessTable`](super::ProcessTable) so they can be changed
//! under one lock.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use spin::Mutex;

use crate::fs::FdTable;
use crate::mm::AddressSpace;
use crate::syscall::{read_user_string, SyscallError};

/// Process ID.
///
/// Always positive; 0 is what a fork child sees instead of a pid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(u32);

impl Pid {
    /// Wrap a pid allocated by the process table.
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Interpret a user-supplied pid.
    ///
    /// Returns None for zero and negative values.
    #[inline]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        if raw > 0 {
            Some(Self(raw as u32))
        } else {
            None
        }
    }

    /// Pid as returned to user code.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user process.
pub struct Process {
    pid: Pid,
    name: Mutex<String>,
    /// None once the image has been torn down (exit, or exec mid-swap).
    space: Mutex<Option<Box<dyn AddressSpace>>>,
    files: Mutex<FdTable>,
}

impl Process {
    pub fn new(pid: Pid, name: &str, space: Box<dyn AddressSpace>, files: FdTable) -> Self {
        Self {
            pid,
            name: Mutex::new(String::from(name)),
            space: Mutex::new(Some(space)),
            files: Mutex::new(files),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Descriptor table. Only the owning thread locks it, except fork which
    /// locks it to copy.
    pub fn files(&self) -> spin::MutexGuard<'_, FdTable> {
        self.files.lock()
    }

    /// Run `f` against the live address space.
    ///
    /// A process without one gets `Efault`: there is no memory that any
    /// pointer could be valid in.
    pub fn with_space<R>(
        &self,
        f: impl FnOnce(&mut dyn AddressSpace) -> Result<R, SyscallError>,
    ) -> Result<R, SyscallError> {
        let mut space = self.space.lock();
        match space.as_deref_mut() {
            Some(space) => f(space),
            None => Err(SyscallError::Efault),
        }
    }

    /// Copy a NUL-terminated string out of this process.
    pub fn read_string(&self, ptr: usize) -> Result<String, SyscallError> {
        self.with_space(|space| read_user_string(space, ptr))
    }

    /// Copy of the address space for a fork child.
    pub fn duplicate_space(&self) -> Option<Box<dyn AddressSpace>> {
        self.space.lock().as_ref()?.duplicate()
    }

    /// Whether some thread is inside `with_space` right now.
    #[cfg(test)]
    pub(crate) fn space_locked(&self) -> bool {
        self.space.is_locked()
    }

    /// Drop the address space. Returns whether there was one.
    pub fn release_space(&self) -> bool {
        self.space.lock().take().is_some()
    }

    /// Install a freshly loaded program image.
    pub fn install_image(&self, name: &str, space: Box<dyn AddressSpace>) {
        *self.space.lock() = Some(space);
        *self.name.lock() = String::from(name);
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &*self.name.lock())
            .field("files", &*self.files.lock())
            .finish()
    }
}
