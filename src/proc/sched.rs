//! Scheduler collaborator
//!
//! Threads, the ready queue and preemption belong to the scheduler. The
//! syscall layer needs four things from it: who is running, start a thread
//! for a new process, and park/unpark a thread for `wait`.

use super::process::Pid;
use crate::syscall::TrapFrame;

/// Error type for thread creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// No memory for a thread control block or kernel stack.
    OutOfMemory,
    /// The scheduler refuses more threads.
    TooManyThreads,
}

impl core::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory for thread"),
            Self::TooManyThreads => write!(f, "thread limit reached"),
        }
    }
}

/// Thread services used by the syscall layer.
///
/// Each process runs on exactly one thread, so threads are named by pid.
pub trait Scheduler: Send + Sync {
    /// Pid of the process whose thread is executing this call.
    fn current(&self) -> Pid;

    /// Create a thread for `pid` that enters user mode with `frame`.
    fn spawn(&self, pid: Pid, name: &str, frame: TrapFrame) -> Result<(), SpawnError>;

    /// Block the calling thread, which belongs to `pid`, until `wake(pid)`.
    ///
    /// A `wake` that arrives before `block` must not be lost: the next
    /// `block` then returns immediately. Spurious returns are allowed;
    /// callers re-check their condition.
    fn block(&self, pid: Pid);

    /// Make `pid`'s thread runnable again.
    fn wake(&self, pid: Pid);
}
