//! Syscall subsystem context
//!
//! Everything the syscall layer shares between processes lives in one
//! [`Kernel`] value, created once at boot and passed by reference into every
//! operation. There are no globals.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::config::FDT_CAPACITY;
use crate::drivers::{Console, Power};
use crate::fs::{FileSystem, FsLock};
use crate::proc::{Loader, Pid, Process, ProcessTable, Scheduler};
use crate::syscall::{self, Outcome, TrapFrame};

/// The collaborators the syscall layer is built on.
pub struct Platform {
    pub filesystem: Box<dyn FileSystem>,
    pub console: Box<dyn Console>,
    pub scheduler: Box<dyn Scheduler>,
    pub loader: Box<dyn Loader>,
    pub power: Box<dyn Power>,
}

/// Shared state of the syscall layer.
pub struct Kernel {
    pub(crate) processes: ProcessTable,
    pub(crate) fs: FsLock,
    pub(crate) console: Box<dyn Console>,
    pub(crate) scheduler: Box<dyn Scheduler>,
    pub(crate) loader: Box<dyn Loader>,
    pub(crate) power: Box<dyn Power>,
}

impl Kernel {
    /// Initialize the syscall layer.
    ///
    /// This is where the filesystem lock comes into existence; it must run
    /// before any process is started.
    pub fn new(platform: Platform) -> Self {
        log::info!(
            "[BOOT] syscall layer initialized ({} descriptors per process)",
            FDT_CAPACITY
        );
        Self {
            processes: ProcessTable::new(),
            fs: FsLock::new(platform.filesystem),
            console: platform.console,
            scheduler: platform.scheduler,
            loader: platform.loader,
            power: platform.power,
        }
    }

    /// Entry point from the trap stub.
    ///
    /// Asks the scheduler which process trapped and dispatches for it.
    pub fn handle_trap(&self, frame: &mut TrapFrame) -> Outcome {
        let caller = self.scheduler.current();
        syscall::dispatch(self, caller, frame)
    }

    /// Look up a process that has not been destroyed.
    pub fn process(&self, pid: Pid) -> Option<Arc<Process>> {
        self.processes.get(pid)
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// The filesystem lock.
    pub fn fs_lock(&self) -> &FsLock {
        &self.fs
    }
}
