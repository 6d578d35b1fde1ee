//! System Call Handler
//!
//! Decodes a trap frame and dispatches to the individual handlers.
//!
//! # Security Considerations
//! - The operation code is decoded into a closed enum; anything else is a
//!   protocol violation and kills the caller
//! - Pointer arguments are validated before use; a bad pointer kills the
//!   caller rather than returning an error
//! - Everything else fails soft with -1 (or false)

use super::frame::{Outcome, TrapFrame};
use super::numbers::Syscall;
use super::{file, process};
use crate::fs::FdtError;
use crate::kernel::Kernel;
use crate::proc::{Pid, Process};

/// System call error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Bad address (invalid pointer)
    Efault,
    /// Invalid system call number
    Enosys,
    /// Program could not be loaded
    Enoexec,
    /// Bad file descriptor
    Ebadf,
    /// Invalid argument
    Einval,
    /// No such file
    Enoent,
    /// Descriptor table full
    Emfile,
    /// Out of memory
    Enomem,
    /// Not a waitable child
    Echild,
}

impl SyscallError {
    /// Whether this error terminates the caller instead of being returned.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Efault | Self::Enosys | Self::Enoexec)
    }
}

impl core::fmt::Display for SyscallError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Efault => write!(f, "bad address"),
            Self::Enosys => write!(f, "unknown system call"),
            Self::Enoexec => write!(f, "exec format error"),
            Self::Ebadf => write!(f, "bad file descriptor"),
            Self::Einval => write!(f, "invalid argument"),
            Self::Enoent => write!(f, "no such file"),
            Self::Emfile => write!(f, "too many open files"),
            Self::Enomem => write!(f, "out of memory"),
            Self::Echild => write!(f, "no such child"),
        }
    }
}

impl From<FdtError> for SyscallError {
    fn from(_: FdtError) -> Self {
        Self::Ebadf
    }
}

/// What a handler wants done with the frame.
pub(super) enum Reply {
    /// Store a result word.
    Value(i64),
    /// Leave the result word alone.
    Void,
    /// Resume in a new program image.
    Replaced(TrapFrame),
    /// Terminate the caller with this status.
    Exit(i32),
    /// Machine powered off.
    Halt,
}

pub(super) type SysResult = Result<Reply, SyscallError>;

/// Dispatch a system call for `caller`.
///
/// # Arguments
/// * `kernel` - Syscall layer state
/// * `caller` - Process that trapped
/// * `frame` - Request on entry, reply on return
///
/// # Returns
/// What the trap entry should do next. After `Exited` or `Halted` the
/// frame is dead and must not be resumed.
pub fn dispatch(kernel: &Kernel, caller: Pid, frame: &mut TrapFrame) -> Outcome {
    let Some(process) = kernel.processes.get_running(caller) else {
        log::warn!("[SYSCALL] trap from unknown process {}", caller);
        frame.faulted = true;
        return Outcome::Exited(-1);
    };

    let reply = match Syscall::try_from(frame.number) {
        Ok(call) => invoke(kernel, &process, call, frame),
        Err(number) => {
            log::warn!("[SYSCALL] Unknown syscall: {}", number);
            Err(SyscallError::Enosys)
        }
    };

    match reply {
        Ok(Reply::Value(value)) => {
            frame.set_return(value);
            Outcome::Resume
        }
        Ok(Reply::Void) => Outcome::Resume,
        Ok(Reply::Replaced(image)) => {
            *frame = image;
            Outcome::Resume
        }
        Ok(Reply::Exit(status)) => {
            kernel.exit(&process, status);
            Outcome::Exited(status)
        }
        Ok(Reply::Halt) => Outcome::Halted,
        Err(err) if err.is_fatal() => {
            log::warn!(
                "[SYSCALL] pid {}: {} in syscall {}, terminating",
                caller,
                err,
                frame.number
            );
            frame.faulted = true;
            kernel.exit(&process, -1);
            Outcome::Exited(-1)
        }
        Err(err) => {
            log::debug!("[SYSCALL] pid {}: syscall {} failed: {}", caller, frame.number, err);
            frame.set_return(-1);
            Outcome::Resume
        }
    }
}

fn invoke(kernel: &Kernel, caller: &Process, call: Syscall, frame: &TrapFrame) -> SysResult {
    match call {
        Syscall::Halt => process::sys_halt(kernel),
        Syscall::Exit => process::sys_exit(frame.arg_int(0)),
        Syscall::Fork => process::sys_fork(kernel, caller, frame.arg_ptr(0), frame),
        Syscall::Exec => process::sys_exec(kernel, caller, frame.arg_ptr(0)),
        Syscall::Wait => process::sys_wait(kernel, caller, frame.arg_int(0)),
        Syscall::Create => file::sys_create(kernel, caller, frame.arg_ptr(0), frame.arg_uint(1)),
        Syscall::Remove => file::sys_remove(kernel, caller, frame.arg_ptr(0)),
        Syscall::Open => file::sys_open(kernel, caller, frame.arg_ptr(0)),
        Syscall::Filesize => file::sys_filesize(kernel, caller, frame.arg_int(0)),
        Syscall::Read => file::sys_read(
            kernel,
            caller,
            frame.arg_int(0),
            frame.arg_ptr(1),
            frame.arg_uint(2),
        ),
        Syscall::Write => file::sys_write(
            kernel,
            caller,
            frame.arg_int(0),
            frame.arg_ptr(1),
            frame.arg_uint(2),
        ),
        Syscall::Seek => file::sys_seek(kernel, caller, frame.arg_int(0), frame.arg_uint(1)),
        Syscall::Tell => file::sys_tell(kernel, caller, frame.arg_int(0)),
        Syscall::Close => file::sys_close(kernel, caller, frame.arg_int(0)),
    }
}
