//! Console collaborator
//!
//! Descriptors 0 and 1 are wired straight to the console. Console I/O never
//! goes through the filesystem lock.

use alloc::format;

use crate::proc::Process;

/// Raw console device.
pub trait Console: Send + Sync {
    /// Block until a byte of input is available and return it.
    fn getc(&self) -> u8;

    /// Write `buf` in one piece; output from concurrent callers must not
    /// interleave within a single call.
    fn putbuf(&self, buf: &[u8]);
}

/// Print the termination line for `process`.
///
/// Formatted in full first so it reaches the device as one `putbuf`.
pub fn print_exit(console: &dyn Console, process: &Process, status: i32) {
    let line = format!("{}: exit({})\n", process.name(), status);
    console.putbuf(line.as_bytes());
}
