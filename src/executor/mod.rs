//! Single-threaded cooperative task execution.
//!
//! The queue has two modes. When idle, an enqueued task executes
//! immediately, and any tasks it enqueued transitively are drained in
//! priority order before the queue returns to idle. While executing,
//! further enqueues only push onto the priority heap; this keeps a task
//! free to plan work without its call stack growing with the tree depth.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;

/// A schedulable unit of work. Tasks may enqueue further tasks.
pub trait Task {
    /// Scheduling priority; larger runs first. Derived from the destination
    /// offset by the multiply planner.
    fn priority(&self) -> i64;

    fn execute(&mut self, queue: &mut TaskQueue) -> Result<()>;
}

struct QueuedTask {
    priority: i64,
    seq: u64,
    task: Box<dyn Task>,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap on priority; earlier enqueues win ties
        self.priority.cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority task queue. Not thread safe; errors abort the drain and clear
/// pending work.
pub struct TaskQueue {
    heap: BinaryHeap<QueuedTask>,
    executing: bool,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), executing: false, next_seq: 0 }
    }

    pub fn enqueue(&mut self, task: Box<dyn Task>) -> Result<()> {
        if self.executing {
            self.push(task);
            return Ok(());
        }

        self.executing = true;
        let mut task = task;
        let result = task.execute(self).and_then(|_| self.drain());
        self.executing = false;
        if result.is_err() {
            self.heap.clear();
        }
        result
    }

    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    fn push(&mut self, task: Box<dyn Task>) {
        let queued = QueuedTask { priority: task.priority(), seq: self.next_seq, task };
        self.next_seq += 1;
        self.heap.push(queued);
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(mut queued) = self.heap.pop() {
            queued.task.execute(self)?;
        }
        Ok(())
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
