//! Process lifecycle: start, fork, exec, wait, exit
//!
//! # Lock order
//! address space, then descriptor table, then filesystem lock, then the
//! process table. `wait` blocks with none of them held.

use alloc::string::String;
use alloc::sync::Arc;

use super::loader::{split_command_line, Image};
use super::process::{Pid, Process};
use super::table::State;
use crate::drivers::console;
use crate::fs::FdTable;
use crate::kernel::Kernel;
use crate::syscall::{SyscallError, TrapFrame};

impl Kernel {
    /// Load the first user program and hand it to the scheduler.
    ///
    /// The process has no parent, so nobody can wait for it.
    pub fn start(&self, cmdline: &str) -> Result<Pid, SyscallError> {
        let (name, image) = self.load_image(cmdline)?;
        let pid = self.processes.alloc_pid();
        let process = Arc::new(Process::new(pid, &name, image.space, FdTable::new()));
        self.processes.insert(process, None);

        if let Err(err) = self.scheduler.spawn(pid, &name, image.frame) {
            log::warn!("[PROCESS] cannot start '{}': {}", name, err);
            self.processes.discard(pid);
            return Err(SyscallError::Enomem);
        }

        log::info!("[PROCESS] started '{}' as pid {}", name, pid);
        Ok(pid)
    }

    /// Split `cmdline` and load the program it names.
    fn load_image(&self, cmdline: &str) -> Result<(String, Image), SyscallError> {
        let argv = split_command_line(cmdline).map_err(|err| {
            log::debug!("[PROCESS] load '{}': {}", cmdline, err);
            SyscallError::Enoexec
        })?;
        let path = argv[0];

        let image = self
            .fs
            .run(|fs| self.loader.load(fs, path, &argv))
            .map_err(|err| {
                log::debug!("[PROCESS] load '{}': {}", path, err);
                SyscallError::Enoexec
            })?;

        Ok((String::from(path), image))
    }

    /// Create a copy of `parent` named `name`.
    ///
    /// The child gets a duplicate address space and descriptor table and
    /// starts from `frame` with a return value of 0. On failure nothing of
    /// the child is left behind and the parent is unchanged.
    pub fn fork(&self, parent: &Process, name: &str, frame: &TrapFrame) -> Result<Pid, SyscallError> {
        let space = parent.duplicate_space().ok_or_else(|| {
            log::debug!("[PROCESS] fork: cannot copy address space of {}", parent.pid());
            SyscallError::Enomem
        })?;

        // Holding the source table's lock for the whole copy keeps it
        // consistent with any concurrent close/open.
        let files = parent.files().duplicate(&self.fs).ok_or_else(|| {
            log::debug!("[PROCESS] fork: cannot copy descriptors of {}", parent.pid());
            SyscallError::Enomem
        })?;

        let pid = self.processes.alloc_pid();
        let child = Arc::new(Process::new(pid, name, space, files));
        self.processes.insert(child.clone(), Some(parent.pid()));

        let mut child_frame = *frame;
        child_frame.set_return(0);
        child_frame.faulted = false;

        if let Err(err) = self.scheduler.spawn(pid, name, child_frame) {
            log::warn!("[PROCESS] fork: cannot start thread: {}", err);
            child.files().close_all(&self.fs);
            child.release_space();
            self.processes.discard(pid);
            return Err(SyscallError::Enomem);
        }

        log::debug!("[PROCESS] {} forked '{}' as pid {}", parent.pid(), name, pid);
        Ok(pid)
    }

    /// Replace the program running in `process`.
    ///
    /// Descriptors stay open. The old image is gone before loading starts,
    /// so a failure here is fatal to the caller (`Enoexec`).
    pub fn exec(&self, process: &Process, cmdline: &str) -> Result<TrapFrame, SyscallError> {
        process.release_space();
        let (name, image) = self.load_image(cmdline)?;
        process.install_image(&name, image.space);
        log::debug!("[PROCESS] pid {} exec '{}'", process.pid(), cmdline);
        Ok(image.frame)
    }

    /// Wait for child `raw` of `parent` to exit and collect its status.
    ///
    /// Fails with `Echild`, without blocking, unless `raw` names an
    /// unreaped direct child.
    pub fn wait(&self, parent: Pid, raw: i32) -> Result<i32, SyscallError> {
        let child = Pid::from_raw(raw).ok_or(SyscallError::Echild)?;

        loop {
            match self.processes.poll_child(parent, child)? {
                Some(status) => {
                    log::debug!("[PROCESS] {} reaped {} (status {})", parent, child, status);
                    return Ok(status);
                }
                None => self.scheduler.block(parent),
            }
        }
    }

    /// Terminate `process` with `status`.
    ///
    /// Prints the exit line, closes every descriptor, drops the address
    /// space, then records the status and wakes a waiting parent. Does
    /// nothing if the process already exited.
    pub fn exit(&self, process: &Process, status: i32) {
        let pid = process.pid();
        if self.processes.state(pid) != Some(State::Running) {
            return;
        }

        console::print_exit(self.console.as_ref(), process, status);

        let closed = process.files().close_all(&self.fs);
        process.release_space();

        if let Some(waiter) = self.processes.retire(pid, status) {
            self.scheduler.wake(waiter);
        }

        log::info!(
            "[PROCESS] pid {} exited with status {} ({} files closed)",
            pid,
            status,
            closed
        );
    }
}
