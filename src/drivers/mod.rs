//! Device collaborators for the syscall layer
//!
//! All devices follow these principles:
//! - Only ever reached through a trait, never a global
//! - No panics on invalid input

pub mod console;
pub mod power;

pub use console::Console;
pub use power::Power;
