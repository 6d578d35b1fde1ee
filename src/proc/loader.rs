//! Program loader collaborator
//!
//! Builds a fresh user image from an executable on disk. Used by `exec`
//! and by the initial program load.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::config::MAX_ARGS;
use crate::fs::FileSystem;
use crate::mm::AddressSpace;
use crate::syscall::TrapFrame;

/// A loaded program, ready to enter user mode.
pub struct Image {
    /// Address space with code, data and the argument stack mapped.
    pub space: Box<dyn AddressSpace>,
    /// Frame to start the program with (entry point, stack, argc/argv).
    pub frame: TrapFrame,
}

/// Error type for program loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// No executable at that path.
    NotFound,
    /// The file is not a loadable executable.
    BadFormat,
    /// No memory for the new image.
    OutOfMemory,
    /// Empty command line, or more than `MAX_ARGS` words.
    BadCommandLine,
}

impl core::fmt::Display for LoadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "executable not found"),
            Self::BadFormat => write!(f, "not a valid executable"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::BadCommandLine => write!(f, "bad command line"),
        }
    }
}

/// Loads executables.
pub trait Loader: Send + Sync {
    /// Load `path` with argument vector `argv` (`argv[0]` is the program
    /// name). Runs under the filesystem lock; `fs` is the filesystem to
    /// read the executable from.
    fn load(&self, fs: &dyn FileSystem, path: &str, argv: &[&str]) -> Result<Image, LoadError>;
}

/// Split a command line into words on runs of spaces.
///
/// The first word is the program path.
pub fn split_command_line(cmdline: &str) -> Result<Vec<&str>, LoadError> {
    let argv: Vec<&str> = cmdline.split(' ').filter(|w| !w.is_empty()).collect();
    if argv.is_empty() || argv.len() > MAX_ARGS {
        return Err(LoadError::BadCommandLine);
    }
    Ok(argv)
}
