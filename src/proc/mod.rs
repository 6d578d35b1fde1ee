//! Process management
//!
//! # Design
//! - One thread per process, named by pid
//! - `ProcessTable` owns the parent/child graph and exit statuses
//! - `Process` owns the per-process resources (address space, descriptors)
//! - Lifecycle operations (start, fork, exec, wait, exit) are methods on
//!   [`Kernel`](crate::Kernel)
//!
//! # Guarantees
//! - An exit status is recorded once and delivered to at most one `wait`
//! - A child never keeps its parent alive
//! - `wait` blocks without holding any lock

mod lifecycle;
mod loader;
mod process;
mod sched;
mod table;

pub use loader::{split_command_line, Image, LoadError, Loader};
pub use process::{Pid, Process};
pub use sched::{Scheduler, SpawnError};
pub use table::{ProcessTable, State};
