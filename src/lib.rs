//! userprog - System-Call Boundary for a Teaching Kernel
//!
//! The layer between a user trap and the rest of the kernel: decode the
//! request, validate every user pointer, run the operation, write back the
//! result.
//!
//! # Responsibilities
//! - Pointer validation (null, kernel half, unmapped or read-only pages)
//! - Per-process file descriptor tables
//! - One lock serializing all filesystem access
//! - Process lifecycle: fork, exec, wait, exit, with exactly-once exit
//!   status delivery
//!
//! # Collaborators
//! Scheduler, VM, filesystem, program loader, console and power switch are
//! consumed through traits and bundled in a [`Platform`] at boot.
//!
//! # Usage
//! 1. Build a [`Platform`] and call [`Kernel::new`]
//! 2. [`Kernel::start`] the first program
//! 3. From the trap stub, call [`Kernel::handle_trap`] and act on the
//!    returned [`Outcome`]

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod fs;
mod kernel;
pub mod mm;
pub mod proc;
pub mod syscall;

#[cfg(test)]
mod mock;

pub use kernel::{Kernel, Platform};
pub use syscall::{dispatch, Outcome, SyscallError, TrapFrame};
