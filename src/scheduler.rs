//! The deferral capability promises schedule their continuations through.
//!
//! A [`Schedule`] implementation hands tasks to the host's task queue; the
//! only requirement is that a task never runs inside the `schedule` call
//! itself. [`LocalScheduler`] is the crate's reference implementation: a
//! deterministic single-threaded run loop with a FIFO ready queue and a
//! virtual-time timer queue.

use core::cmp::Ordering;
use core::cmp::Reverse;
use core::fmt;
use std::cell::RefCell;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// A shared handle to the scheduler a promise dispatches through.
pub type SchedulerHandle = Rc<dyn Schedule>;

/// Defers a task to a later execution turn.
///
/// Implementations must enqueue the task and return; running it on the
/// current call stack breaks the promise ordering guarantees.
pub trait Schedule {
    /// Enqueue `task` to run on a later turn.
    fn schedule(&self, task: Task);
}

/// A deterministic single-threaded scheduler with virtual time.
///
/// Tasks enqueued with [`schedule`][Schedule::schedule] run in FIFO order.
/// Tasks registered with [`schedule_after`][LocalScheduler::schedule_after]
/// run once the ready queue drains and the virtual clock reaches their
/// deadline; ties break by registration order.
#[derive(Clone)]
pub struct LocalScheduler {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    ready: VecDeque<Task>,
    timers: BinaryHeap<Reverse<TimerEntry>>,
    now: u64,
    timer_seq: u64,
}

struct TimerEntry {
    due: u64,
    seq: u64,
    task: Task,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl LocalScheduler {
    /// Creates an idle scheduler with the clock at zero.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                ready: VecDeque::new(),
                timers: BinaryHeap::new(),
                now: 0,
                timer_seq: 0,
            })),
        }
    }

    /// Returns a handle suitable for constructing promises against.
    pub fn handle(&self) -> SchedulerHandle {
        Rc::new(self.clone())
    }

    /// The current virtual time.
    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Registers `task` to run once the virtual clock has advanced by
    /// `delay` time units and the ready queue is empty.
    pub fn schedule_after(&self, delay: u64, task: Task) {
        let mut inner = self.inner.borrow_mut();
        let due = inner.now.saturating_add(delay);
        let seq = inner.timer_seq;
        inner.timer_seq += 1;
        inner.timers.push(Reverse(TimerEntry { due, seq, task }));
    }

    /// Runs until no ready task or timer remains.
    ///
    /// Ready tasks run first, in FIFO order; when the ready queue drains the
    /// clock jumps to the earliest outstanding deadline and that timer's task
    /// runs. Tasks enqueued while running are picked up in the same call.
    pub fn run(&self) {
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                if let Some(task) = inner.ready.pop_front() {
                    Some(task)
                } else if let Some(Reverse(entry)) = inner.timers.pop() {
                    inner.now = inner.now.max(entry.due);
                    Some(entry.task)
                } else {
                    None
                }
            };
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule for LocalScheduler {
    fn schedule(&self, task: Task) {
        self.inner.borrow_mut().ready.push_back(task);
    }
}

impl fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("LocalScheduler")
            .field("now", &inner.now)
            .field("ready", &inner.ready.len())
            .field("timers", &inner.timers.len())
            .finish()
    }
}
