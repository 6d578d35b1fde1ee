//! Filesystem Access Serializer
//!
//! One lock for the whole filesystem. It owns the collaborator, so the
//! only way to reach `FileSystem` is through [`FsLock::run`], and the guard
//! is dropped on every path out of the closure.
//!
//! The lock is a ticket lock: waiters are served in arrival order, so no
//! process can be starved by others repeatedly re-acquiring it.

use alloc::boxed::Box;

use spin::mutex::TicketMutex;

use super::FileSystem;

/// Process-wide filesystem lock.
pub struct FsLock {
    fs: TicketMutex<Box<dyn FileSystem>>,
}

impl FsLock {
    /// Wrap the filesystem collaborator.
    pub fn new(fs: Box<dyn FileSystem>) -> Self {
        Self {
            fs: TicketMutex::new(fs),
        }
    }

    /// Run `f` with the lock held.
    ///
    /// Not reentrant: calling `run` again from inside `f` deadlocks.
    /// `f` must not block on another thread (in particular, never wait on a
    /// child) while it holds the lock.
    pub fn run<R>(&self, f: impl FnOnce(&dyn FileSystem) -> R) -> R {
        let fs = self.fs.lock();
        f(&**fs)
    }

    /// Whether some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.fs.is_locked()
    }
}

impl core::fmt::Debug for FsLock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FsLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
