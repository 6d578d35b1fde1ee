//! System Call Interface
//!
//! The boundary between user programs and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only the operations in [`Syscall`] exist
//! - All pointer parameters are validated before use
//! - A bad pointer or unknown operation terminates the caller
//! - Invalid handles and missing files return -1/false, never panic
//!
//! # Current Syscalls
//! - 0: halt() - power off
//! - 1: exit(status) - terminate the current process
//! - 2: fork(name) - duplicate the current process
//! - 3: exec(cmdline) - replace the current program
//! - 4: wait(pid) - collect a child's exit status
//! - 5: create(path, size) / 6: remove(path) / 7: open(path)
//! - 8: filesize(fd) / 9: read(fd, buf, len) / 10: write(fd, buf, len)
//! - 11: seek(fd, pos) / 12: tell(fd) / 13: close(fd)

mod file;
mod frame;
mod handler;
pub mod numbers;
mod process;
mod validate;

pub use frame::{Outcome, TrapFrame};
pub use handler::{dispatch, SyscallError};
pub use numbers::Syscall;
pub use validate::{
    read_user_string, validate_user_read, validate_user_write, UserBuffer, UserBufferMut,
};
