//! Process table and lifecycle state
//!
//! Holds every process that has not been fully destroyed, together with
//! the parent/child graph and each process's place in the lifecycle:
//!
//! ```text
//!   Running --exit--> Zombie(status) --parent wait--> Reaped (removed)
//! ```
//!
//! A parent is referred to by pid only. A child never keeps its parent
//! alive; when the parent exits first the child is orphaned, and orphans
//! are removed as soon as they exit because nobody can wait for them.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use super::process::{Pid, Process};
use crate::syscall::SyscallError;

/// Where a process is in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Running,
    /// Exited; the status waits for the parent.
    Zombie(i32),
    /// Status consumed. Only ever observed transiently: a reaped process is
    /// removed from the table in the same critical section.
    Reaped,
}

struct Node {
    process: Arc<Process>,
    parent: Option<Pid>,
    children: BTreeSet<Pid>,
    state: State,
    /// Parent thread parked in `wait` on this process.
    waiter: Option<Pid>,
}

/// All live and zombie processes.
pub struct ProcessTable {
    nodes: Mutex<BTreeMap<Pid, Node>>,
    next_pid: AtomicU32,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            next_pid: AtomicU32::new(1),
        }
    }

    /// Hand out a fresh pid.
    pub fn alloc_pid(&self) -> Pid {
        Pid::new(self.next_pid.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a new running process, as a child of `parent` if given.
    pub fn insert(&self, process: Arc<Process>, parent: Option<Pid>) {
        let pid = process.pid();
        let mut nodes = self.nodes.lock();
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.insert(pid);
        }
        nodes.insert(
            pid,
            Node {
                process,
                parent,
                children: BTreeSet::new(),
                state: State::Running,
                waiter: None,
            },
        );
    }

    /// Undo an `insert` for a process that never got to run.
    pub fn discard(&self, pid: Pid) {
        let mut nodes = self.nodes.lock();
        if let Some(node) = nodes.remove(&pid) {
            if let Some(parent) = node.parent.and_then(|p| nodes.get_mut(&p)) {
                parent.children.remove(&pid);
            }
        }
    }

    /// Look up a process in any state.
    pub fn get(&self, pid: Pid) -> Option<Arc<Process>> {
        self.nodes.lock().get(&pid).map(|node| node.process.clone())
    }

    /// Look up a process that can still make system calls.
    pub fn get_running(&self, pid: Pid) -> Option<Arc<Process>> {
        let nodes = self.nodes.lock();
        let node = nodes.get(&pid)?;
        (node.state == State::Running).then(|| node.process.clone())
    }

    pub fn state(&self, pid: Pid) -> Option<State> {
        self.nodes.lock().get(&pid).map(|node| node.state)
    }

    pub fn parent(&self, pid: Pid) -> Option<Pid> {
        self.nodes.lock().get(&pid).and_then(|node| node.parent)
    }

    /// Children of `pid` that have not been reaped.
    pub fn children(&self, pid: Pid) -> Vec<Pid> {
        self.nodes
            .lock()
            .get(&pid)
            .map(|node| node.children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of processes not yet destroyed.
    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One step of `wait`.
    ///
    /// - `Ok(Some(status))`: the child was a zombie and is now reaped
    /// - `Ok(None)`: the child is still running; `parent` is recorded as its
    ///   waiter and should block until woken, then poll again
    /// - `Err(Echild)`: `child` is not an unreaped child of `parent`
    pub fn poll_child(&self, parent: Pid, child: Pid) -> Result<Option<i32>, SyscallError> {
        let mut nodes = self.nodes.lock();

        let is_child = nodes
            .get(&parent)
            .is_some_and(|node| node.children.contains(&child));
        if !is_child {
            return Err(SyscallError::Echild);
        }

        let node = nodes.get_mut(&child).ok_or(SyscallError::Echild)?;
        let state = node.state;
        match state {
            State::Running => {
                node.waiter = Some(parent);
                Ok(None)
            }
            State::Zombie(status) => {
                node.state = State::Reaped;
                nodes.remove(&child);
                if let Some(parent) = nodes.get_mut(&parent) {
                    parent.children.remove(&child);
                }
                Ok(Some(status))
            }
            State::Reaped => Err(SyscallError::Echild),
        }
    }

    /// Move `pid` out of `Running` with `status`.
    ///
    /// Its children are orphaned (zombie children are destroyed at once). If
    /// it still has a parent it becomes a zombie, otherwise it is destroyed.
    /// Returns the parked parent to wake, if any. Calling this on a process
    /// that is not running does nothing.
    pub fn retire(&self, pid: Pid, status: i32) -> Option<Pid> {
        let mut nodes = self.nodes.lock();

        let node = nodes.get_mut(&pid)?;
        if node.state != State::Running {
            return None;
        }
        let children = core::mem::take(&mut node.children);
        let has_parent = node.parent.is_some();

        if has_parent {
            node.state = State::Zombie(status);
        } else {
            node.state = State::Reaped;
        }
        let waiter = node.waiter.take();

        for child in children {
            let Some(orphan) = nodes.get_mut(&child) else { continue };
            orphan.parent = None;
            if matches!(orphan.state, State::Zombie(_)) {
                nodes.remove(&child);
            }
        }

        if !has_parent {
            nodes.remove(&pid);
        }

        waiter
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
