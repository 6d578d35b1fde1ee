//! File and console system calls
//!
//! Pointer arguments are validated (and copied) before anything else runs,
//! so a bad pointer never leaves a partial effect behind. Every call into
//! the filesystem goes through `FsLock::run`; console descriptors never do.

use alloc::vec;
use alloc::vec::Vec;

use super::handler::{Reply, SysResult, SyscallError};
use super::validate::{validate_user_read, validate_user_write};
use crate::fs::Descriptor;
use crate::kernel::Kernel;
use crate::proc::Process;

/// Turn a failure into `false` unless it is fatal.
fn or_false(result: Result<bool, SyscallError>) -> SysResult {
    match result {
        Ok(ok) => Ok(Reply::Value(ok as i64)),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            log::debug!("[SYSCALL] {}", err);
            Ok(Reply::Value(0))
        }
    }
}

pub(super) fn sys_create(kernel: &Kernel, caller: &Process, path: usize, size: u32) -> SysResult {
    or_false(
        caller
            .read_string(path)
            .map(|path| kernel.fs.run(|fs| fs.create(&path, size))),
    )
}

pub(super) fn sys_remove(kernel: &Kernel, caller: &Process, path: usize) -> SysResult {
    or_false(
        caller
            .read_string(path)
            .map(|path| kernel.fs.run(|fs| fs.remove(&path))),
    )
}

/// Open a file and install it in the caller's descriptor table.
///
/// # Arguments
/// * `path` - User pointer to a NUL-terminated path
///
/// # Returns
/// The new descriptor (lowest free, at least 2), or -1 if the file doesn't
/// exist or the table is full.
///
/// # Security
/// - Path is copied in page by page before the filesystem sees it
/// - A handle that can't be installed is closed, never leaked
pub(super) fn sys_open(kernel: &Kernel, caller: &Process, path: usize) -> SysResult {
    let path = caller.read_string(path)?;
    let file = kernel
        .fs
        .run(|fs| fs.open(&path))
        .ok_or(SyscallError::Enoent)?;

    match caller.files().allocate(file) {
        Ok(fd) => {
            log::debug!("[SYSCALL] pid {} open '{}' = {}", caller.pid(), path, fd.as_raw());
            Ok(Reply::Value(fd.as_raw() as i64))
        }
        Err(file) => {
            kernel.fs.run(|_| file.close());
            Err(SyscallError::Emfile)
        }
    }
}

pub(super) fn sys_filesize(kernel: &Kernel, caller: &Process, fd: i32) -> SysResult {
    let mut files = caller.files();
    let file = files.lookup(fd)?;
    let len = kernel.fs.run(|_| file.length());
    Ok(Reply::Value(len as i64))
}

/// Read from a file or the keyboard into user memory.
///
/// # Arguments
/// * `fd` - 0 for the console, or an open file descriptor
/// * `buf` - User buffer to fill
/// * `len` - Maximum bytes to read
///
/// # Returns
/// Bytes read, or -1 for fd 1 and descriptors that aren't open.
///
/// # Security
/// - Whole buffer must be mapped user-writable, checked before reading
/// - No lock on the address space is held while the device or the
///   filesystem runs; the destination is checked again before the copy
/// - Only the bytes read are stored, the rest of the buffer is untouched
pub(super) fn sys_read(kernel: &Kernel, caller: &Process, fd: i32, buf: usize, len: u32) -> SysResult {
    let len = len as usize;
    caller.with_space(|space| validate_user_write(space, buf, len).map(|_| ()))?;

    let (data, count) = match Descriptor::classify(fd) {
        Some(Descriptor::Stdin) => read_console(kernel, len),
        Some(Descriptor::File(_)) => {
            let mut files = caller.files();
            let file = files.lookup(fd)?;
            let mut data = vec![0u8; len];
            let count = kernel.fs.run(|_| file.read(&mut data));
            data.truncate(count);
            (data, count)
        }
        Some(Descriptor::Stdout) | None => return Err(SyscallError::Ebadf),
    };

    caller.with_space(|space| {
        let dst = validate_user_write(space, buf, data.len())?;
        dst.copy_out(space, &data);
        Ok(Reply::Value(count as i64))
    })
}

/// Pull up to `len` bytes from the keyboard.
///
/// Stops after a NUL byte. The NUL is stored but not counted.
fn read_console(kernel: &Kernel, len: usize) -> (Vec<u8>, usize) {
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let key = kernel.console.getc();
        data.push(key);
        if key == 0 {
            let count = data.len() - 1;
            return (data, count);
        }
    }
    let count = data.len();
    (data, count)
}

/// Write user memory to a file or the console.
///
/// # Arguments
/// * `fd` - 1 for the console, or an open file descriptor
/// * `buf` - User buffer holding the data
/// * `len` - Number of bytes
///
/// # Returns
/// Bytes written, or -1 for fd 0 and descriptors that aren't open.
///
/// # Security
/// - Data is copied into the kernel before any device or file sees it
/// - Console output is one `putbuf` and skips the filesystem lock
pub(super) fn sys_write(kernel: &Kernel, caller: &Process, fd: i32, buf: usize, len: u32) -> SysResult {
    let data = caller.with_space(|space| Ok(validate_user_read(space, buf, len as usize)?.copy_in(space)))?;

    match Descriptor::classify(fd) {
        Some(Descriptor::Stdout) => {
            kernel.console.putbuf(&data);
            Ok(Reply::Value(data.len() as i64))
        }
        Some(Descriptor::File(_)) => {
            let mut files = caller.files();
            let file = files.lookup(fd)?;
            let count = kernel.fs.run(|_| file.write(&data));
            Ok(Reply::Value(count as i64))
        }
        Some(Descriptor::Stdin) | None => Err(SyscallError::Ebadf),
    }
}

pub(super) fn sys_seek(kernel: &Kernel, caller: &Process, fd: i32, pos: u32) -> SysResult {
    if let Ok(file) = caller.files().lookup(fd) {
        kernel.fs.run(|_| file.seek(pos));
    }
    Ok(Reply::Void)
}

pub(super) fn sys_tell(kernel: &Kernel, caller: &Process, fd: i32) -> SysResult {
    let mut files = caller.files();
    let file = files.lookup(fd)?;
    let pos = kernel.fs.run(|_| file.tell());
    Ok(Reply::Value(pos as i64))
}

pub(super) fn sys_close(kernel: &Kernel, caller: &Process, fd: i32) -> SysResult {
    caller.files().release(fd, &kernel.fs);
    Ok(Reply::Void)
}
