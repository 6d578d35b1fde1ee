//! Trap Frame
//!
//! The per-call record the trap entry hands to the dispatcher. Register
//! save/restore is the entry stub's business; this is only the logical
//! view: one operation code, three argument words, one result word.

/// Syscall request and reply for a single trap.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// Operation code.
    pub number: u64,
    /// Argument words, in order.
    pub args: [u64; 3],
    /// Result word, written back by the dispatcher.
    pub ret: u64,
    /// Set when the call was rejected as a protocol violation.
    pub faulted: bool,
    /// User program counter to resume at.
    pub pc: u64,
    /// User stack pointer to resume with.
    pub sp: u64,
}

impl TrapFrame {
    /// Build a request frame for `number` with the given arguments.
    pub const fn syscall(number: u64, args: [u64; 3]) -> Self {
        Self {
            number,
            args,
            ret: 0,
            faulted: false,
            pc: 0,
            sp: 0,
        }
    }

    /// Argument `n` as a signed 32-bit integer (fd, pid, status).
    #[inline]
    pub fn arg_int(&self, n: usize) -> i32 {
        self.args[n] as i32
    }

    /// Argument `n` as an unsigned 32-bit integer (sizes, positions).
    #[inline]
    pub fn arg_uint(&self, n: usize) -> u32 {
        self.args[n] as u32
    }

    /// Argument `n` as an address word.
    #[inline]
    pub fn arg_ptr(&self, n: usize) -> usize {
        self.args[n] as usize
    }

    /// Store a result for the user program.
    #[inline]
    pub fn set_return(&mut self, value: i64) {
        self.ret = value as u64;
    }

    /// Result word read back as a signed value.
    #[inline]
    pub fn return_value(&self) -> i64 {
        self.ret as i64
    }
}

/// What the trap entry should do once the dispatcher is done.
///
/// `Exited` and `Halted` are absorbing: the calling thread is gone (or the
/// whole machine is) and its frame must not be resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    /// Return to user mode with the (possibly updated) frame.
    Resume,
    /// The calling process terminated with this status.
    Exited(i32),
    /// The machine was powered off.
    Halted,
}
