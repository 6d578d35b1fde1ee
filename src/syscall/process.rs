//! Process system calls
//!
//! Thin wrappers: copy string arguments in, then hand over to the
//! lifecycle operations on [`Kernel`].

use super::frame::TrapFrame;
use super::handler::{Reply, SysResult, SyscallError};
use crate::kernel::Kernel;
use crate::proc::Process;

pub(super) fn sys_halt(kernel: &Kernel) -> SysResult {
    log::info!("[SYSCALL] halt: powering off");
    kernel.power.power_off();
    Ok(Reply::Halt)
}

pub(super) fn sys_exit(status: i32) -> SysResult {
    Ok(Reply::Exit(status))
}

/// Duplicate the calling process.
///
/// # Arguments
/// * `name` - User pointer to the child's NUL-terminated name
///
/// # Returns
/// The child's pid in the parent, 0 in the child, -1 if the child could not
/// be created.
///
/// # Security
/// - Name is copied in before anything is duplicated
/// - A failed fork leaves no trace of the child
pub(super) fn sys_fork(kernel: &Kernel, caller: &Process, name: usize, frame: &TrapFrame) -> SysResult {
    let name = caller.read_string(name)?;
    let pid = kernel.fork(caller, &name, frame)?;
    Ok(Reply::Value(pid.as_raw() as i64))
}

/// Replace the caller's program.
///
/// # Arguments
/// * `cmdline` - User pointer to the NUL-terminated command line
///
/// # Returns
/// Does not return to the old program. A command line that can't be loaded
/// terminates the caller with -1.
pub(super) fn sys_exec(kernel: &Kernel, caller: &Process, cmdline: usize) -> SysResult {
    // A command line that isn't text can't name a program.
    let cmdline = caller.read_string(cmdline).map_err(|err| {
        if err.is_fatal() {
            err
        } else {
            SyscallError::Enoexec
        }
    })?;
    kernel.exec(caller, &cmdline).map(Reply::Replaced)
}

/// Collect the exit status of a direct child, blocking until it exits.
///
/// # Returns
/// The child's status, or -1 if `pid` is not an unreaped child.
///
/// # Security
/// - Only direct children can be waited for, and each only once
/// - Blocks with no lock held
pub(super) fn sys_wait(kernel: &Kernel, caller: &Process, pid: i32) -> SysResult {
    let status = kernel.wait(caller.pid(), pid)?;
    Ok(Reply::Value(status as i64))
}
