//! In-memory collaborators for host tests
//!
//! Each mock is a cheap handle onto shared state: one clone goes into the
//! [`Platform`], the test keeps another to inspect and steer it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, Thread, ThreadId};

use crate::drivers::{Console, Power};
use crate::fs::{File, FileSystem};
use crate::kernel::{Kernel, Platform};
use crate::mm::{AddressSpace, PageFlags, VirtAddr, PAGE_SIZE};
use crate::proc::{Image, LoadError, Loader, Pid, Scheduler, SpawnError};
use crate::syscall::numbers::{SYS_FORK, SYS_OPEN};
use crate::syscall::{dispatch, Outcome, TrapFrame, UserBuffer, UserBufferMut};

/// Where loaded programs start.
pub const ENTRY_POINT: u64 = 0x0040_0000;

/// Top of the user stack handed out by [`MockLoader`].
pub const STACK_TOP: u64 = 0x7fff_f000;

/// Writable address in the init image the harness uses for paths.
pub const SCRATCH: usize = 0x1800;

struct Page {
    flags: PageFlags,
    bytes: Box<[u8; PAGE_SIZE]>,
}

#[derive(Default)]
struct SpaceState {
    pages: BTreeMap<usize, Page>,
    no_duplicate: bool,
}

/// Sparse page-granular memory.
#[derive(Clone, Default)]
pub struct MockSpace {
    state: Arc<Mutex<SpaceState>>,
}

impl MockSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a zeroed page at `base`.
    pub fn map(&self, base: usize, flags: PageFlags) {
        assert_eq!(base % PAGE_SIZE, 0, "unaligned page {:#x}", base);
        let page = Page {
            flags,
            bytes: Box::new([0; PAGE_SIZE]),
        };
        self.state.lock().unwrap().pages.insert(base, page);
    }

    /// Store bytes ignoring page permissions. The pages must be mapped.
    pub fn poke(&self, addr: usize, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for (i, &byte) in data.iter().enumerate() {
            let at = addr + i;
            let page = state
                .pages
                .get_mut(&(at & !(PAGE_SIZE - 1)))
                .unwrap_or_else(|| panic!("poke into unmapped {:#x}", at));
            page.bytes[at % PAGE_SIZE] = byte;
        }
    }

    /// Store `s` with a terminating NUL.
    pub fn poke_str(&self, addr: usize, s: &str) {
        let mut data = s.as_bytes().to_vec();
        data.push(0);
        self.poke(addr, &data);
    }

    pub fn peek(&self, addr: usize, len: usize) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        (addr..addr + len)
            .map(|at| {
                let page = state
                    .pages
                    .get(&(at & !(PAGE_SIZE - 1)))
                    .unwrap_or_else(|| panic!("peek into unmapped {:#x}", at));
                page.bytes[at % PAGE_SIZE]
            })
            .collect()
    }

    /// Make `duplicate` fail as if out of memory.
    pub fn set_duplicable(&self, yes: bool) {
        self.state.lock().unwrap().no_duplicate = !yes;
    }
}

impl AddressSpace for MockSpace {
    fn lookup(&self, page: VirtAddr) -> Option<PageFlags> {
        let state = self.state.lock().unwrap();
        state.pages.get(&page.as_usize()).map(|p| p.flags)
    }

    fn copy_in(&self, src: &UserBuffer, dst: &mut [u8]) {
        dst.copy_from_slice(&self.peek(src.addr().as_usize(), src.len()));
    }

    fn copy_out(&mut self, dst: &UserBufferMut, src: &[u8]) {
        assert!(src.len() <= dst.len());
        self.poke(dst.addr().as_usize(), src);
    }

    fn duplicate(&self) -> Option<Box<dyn AddressSpace>> {
        let state = self.state.lock().unwrap();
        if state.no_duplicate {
            return None;
        }
        let pages = state
            .pages
            .iter()
            .map(|(&base, page)| {
                let copy = Page {
                    flags: page.flags,
                    bytes: page.bytes.clone(),
                };
                (base, copy)
            })
            .collect();
        let copy = MockSpace {
            state: Arc::new(Mutex::new(SpaceState {
                pages,
                no_duplicate: false,
            })),
        };
        Some(Box::new(copy))
    }
}

type Contents = Arc<Mutex<Vec<u8>>>;

#[derive(Default)]
struct FsState {
    files: BTreeMap<String, Contents>,
    open_handles: usize,
    calls: usize,
    fail_duplicates: bool,
    /// Every byte written through any handle, in order.
    journal: Vec<u8>,
}

/// Flat in-memory filesystem with call accounting.
#[derive(Clone, Default)]
pub struct MockFs {
    state: Arc<Mutex<FsState>>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace `path` without counting a call.
    pub fn insert(&self, path: &str, data: &[u8]) {
        let contents = Arc::new(Mutex::new(data.to_vec()));
        self.state.lock().unwrap().files.insert(path.into(), contents);
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let contents = state.files.get(path)?;
        let data = contents.lock().unwrap().clone();
        Some(data)
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().unwrap().open_handles
    }

    /// Number of collaborator calls made so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn fail_duplicates(&self, yes: bool) {
        self.state.lock().unwrap().fail_duplicates = yes;
    }

    pub fn journal(&self) -> Vec<u8> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Count one collaborator call.
    fn record(&self) {
        self.state.lock().unwrap().calls += 1;
    }

    /// Count one collaborator call and lock the state for it.
    fn count(&self) -> std::sync::MutexGuard<'_, FsState> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state
    }
}

impl FileSystem for MockFs {
    fn create(&self, path: &str, initial_size: u32) -> bool {
        let mut state = self.count();
        if path.is_empty() || state.files.contains_key(path) {
            return false;
        }
        let contents = Arc::new(Mutex::new(vec![0; initial_size as usize]));
        state.files.insert(path.into(), contents);
        true
    }

    fn remove(&self, path: &str) -> bool {
        // Open handles keep their contents alive.
        self.count().files.remove(path).is_some()
    }

    fn open(&self, path: &str) -> Option<Box<dyn File>> {
        let mut state = self.count();
        let contents = state.files.get(path)?.clone();
        state.open_handles += 1;
        Some(Box::new(MockFile {
            fs: self.clone(),
            contents,
            pos: 0,
        }))
    }
}

struct MockFile {
    fs: MockFs,
    contents: Contents,
    pos: u32,
}

impl File for MockFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.fs.record();
        let data = self.contents.lock().unwrap();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u32;
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        self.fs.record();
        // Byte at a time with a yield in between, so unserialized callers
        // would interleave.
        for &byte in buf {
            {
                let mut data = self.contents.lock().unwrap();
                let at = self.pos as usize;
                if at < data.len() {
                    data[at] = byte;
                } else {
                    data.resize(at, 0);
                    data.push(byte);
                }
            }
            self.fs.state.lock().unwrap().journal.push(byte);
            self.pos += 1;
            thread::yield_now();
        }
        buf.len()
    }

    fn seek(&mut self, pos: u32) {
        self.fs.record();
        self.pos = pos;
    }

    fn tell(&self) -> u32 {
        self.fs.record();
        self.pos
    }

    fn length(&self) -> u32 {
        self.fs.record();
        self.contents.lock().unwrap().len() as u32
    }

    fn duplicate(&self) -> Option<Box<dyn File>> {
        let mut state = self.fs.count();
        if state.fail_duplicates {
            return None;
        }
        state.open_handles += 1;
        Some(Box::new(MockFile {
            fs: self.fs.clone(),
            contents: self.contents.clone(),
            pos: self.pos,
        }))
    }

    fn close(self: Box<Self>) {
        self.fs.count().open_handles -= 1;
    }
}

#[derive(Default)]
struct ConsoleState {
    input: VecDeque<u8>,
    output: Vec<u8>,
    on_getc: Option<Arc<dyn Fn() + Send + Sync>>,
}

#[derive(Clone, Default)]
pub struct MockConsole {
    state: Arc<Mutex<ConsoleState>>,
}

impl MockConsole {
    /// Queue keyboard input.
    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().unwrap().input.extend(bytes);
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().unwrap().output).into_owned()
    }

    /// Run `f` on every `getc`, standing in for the thread sleeping on the
    /// keyboard.
    pub fn on_getc(&self, f: impl Fn() + Send + Sync + 'static) {
        self.state.lock().unwrap().on_getc = Some(Arc::new(f));
    }
}

impl Console for MockConsole {
    /// Returns NUL once the queued input runs dry.
    fn getc(&self) -> u8 {
        let hook = self.state.lock().unwrap().on_getc.clone();
        if let Some(hook) = hook {
            hook();
        }
        self.state.lock().unwrap().input.pop_front().unwrap_or(0)
    }

    fn putbuf(&self, buf: &[u8]) {
        self.state.lock().unwrap().output.extend_from_slice(buf);
    }
}

#[derive(Clone, Default)]
pub struct MockPower {
    off: Arc<AtomicBool>,
}

impl MockPower {
    pub fn is_off(&self) -> bool {
        self.off.load(Ordering::SeqCst)
    }
}

impl Power for MockPower {
    fn power_off(&self) {
        self.off.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct SchedState {
    running: HashMap<ThreadId, Pid>,
    threads: HashMap<Pid, Thread>,
    spawned: Vec<(Pid, String, TrapFrame)>,
    fail_spawn: bool,
}

/// Maps test threads to pids. `spawn` only records; tests drive the new
/// process from a thread they `attach` themselves.
#[derive(Clone, Default)]
pub struct MockScheduler {
    state: Arc<Mutex<SchedState>>,
    blocked: Arc<AtomicUsize>,
}

impl MockScheduler {
    /// Let the calling thread run as `pid`.
    pub fn attach(&self, pid: Pid) {
        let mut state = self.state.lock().unwrap();
        state.running.insert(thread::current().id(), pid);
        state.threads.insert(pid, thread::current());
    }

    pub fn spawned(&self) -> Vec<(Pid, String, TrapFrame)> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn fail_spawn(&self, yes: bool) {
        self.state.lock().unwrap().fail_spawn = yes;
    }

    /// Threads currently parked in `block`.
    pub fn blocked(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }
}

impl Scheduler for MockScheduler {
    fn current(&self) -> Pid {
        let state = self.state.lock().unwrap();
        *state
            .running
            .get(&thread::current().id())
            .expect("thread not attached to a process")
    }

    fn spawn(&self, pid: Pid, name: &str, frame: TrapFrame) -> Result<(), SpawnError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_spawn {
            return Err(SpawnError::OutOfMemory);
        }
        state.spawned.push((pid, name.into(), frame));
        Ok(())
    }

    fn block(&self, _pid: Pid) {
        self.blocked.fetch_add(1, Ordering::SeqCst);
        thread::park();
        self.blocked.fetch_sub(1, Ordering::SeqCst);
    }

    fn wake(&self, pid: Pid) {
        let thread = self.state.lock().unwrap().threads.get(&pid).cloned();
        if let Some(thread) = thread {
            thread.unpark();
        }
    }
}

#[derive(Default)]
struct LoaderState {
    programs: BTreeMap<String, MockSpace>,
    argv_log: Vec<Vec<String>>,
}

/// Serves pre-built images by path.
#[derive(Clone, Default)]
pub struct MockLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl MockLoader {
    /// Make `path` loadable. The loaded image shares memory with `space`.
    pub fn install(&self, path: &str, space: MockSpace) {
        self.state.lock().unwrap().programs.insert(path.into(), space);
    }

    pub fn argv_log(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().argv_log.clone()
    }
}

impl Loader for MockLoader {
    fn load(&self, _fs: &dyn FileSystem, path: &str, argv: &[&str]) -> Result<Image, LoadError> {
        let mut state = self.state.lock().unwrap();
        state
            .argv_log
            .push(argv.iter().map(|arg| arg.to_string()).collect());
        let space = state.programs.get(path).ok_or(LoadError::NotFound)?.clone();

        let mut frame = TrapFrame::syscall(0, [argv.len() as u64, STACK_TOP, 0]);
        frame.pc = ENTRY_POINT;
        frame.sp = STACK_TOP;
        Ok(Image {
            space: Box::new(space),
            frame,
        })
    }
}

/// A booted kernel running `init` on the test's main thread.
pub struct Harness {
    pub kernel: Kernel,
    pub init: Pid,
    /// Memory of the init image.
    pub space: MockSpace,
    pub fs: MockFs,
    pub console: MockConsole,
    pub sched: MockScheduler,
    pub loader: MockLoader,
    pub power: MockPower,
}

impl Harness {
    /// Pages 0x1000-0x2fff are writable, 0x5000 is read-only.
    pub fn boot() -> Self {
        let space = MockSpace::new();
        space.map(0x1000, PageFlags::USER_WRITE);
        space.map(0x2000, PageFlags::USER_WRITE);
        space.map(0x5000, PageFlags::USER_READ);

        let echo = MockSpace::new();
        echo.map(0x1000, PageFlags::USER_WRITE);

        let fs = MockFs::new();
        let console = MockConsole::default();
        let sched = MockScheduler::default();
        let loader = MockLoader::default();
        let power = MockPower::default();
        loader.install("init", space.clone());
        loader.install("echo", echo);

        let kernel = Kernel::new(Platform {
            filesystem: Box::new(fs.clone()),
            console: Box::new(console.clone()),
            scheduler: Box::new(sched.clone()),
            loader: Box::new(loader.clone()),
            power: Box::new(power.clone()),
        });
        let init = kernel.start("init --verbose").expect("boot init");
        sched.attach(init);

        Self {
            kernel,
            init,
            space,
            fs,
            console,
            sched,
            loader,
            power,
        }
    }

    /// Trap into the kernel as `pid`.
    pub fn call(&self, pid: Pid, number: u64, args: [u64; 3]) -> (Outcome, TrapFrame) {
        let mut frame = TrapFrame::syscall(number, args);
        let outcome = dispatch(&self.kernel, pid, &mut frame);
        (outcome, frame)
    }

    /// Open `path` as init and return the descriptor.
    pub fn open(&self, path: &str) -> i32 {
        self.space.poke_str(SCRATCH, path);
        let (outcome, frame) = self.call(self.init, SYS_OPEN, [SCRATCH as u64, 0, 0]);
        assert_eq!(outcome, Outcome::Resume);
        let fd = frame.return_value();
        assert!(fd >= 2, "open({}) = {}", path, fd);
        fd as i32
    }

    /// Fork `parent` without going through the name-copying path.
    pub fn fork(&self, parent: Pid, name: &str) -> Pid {
        let process = self.kernel.process(parent).expect("fork from live process");
        let frame = TrapFrame::syscall(SYS_FORK, [0, 0, 0]);
        self.kernel.fork(&process, name, &frame).expect("fork")
    }
}
