use std::collections::VecDeque;
use std::fmt;

/// An unbounded FIFO of pending tasks.
///
/// The queue is not synchronized on its own. The pool keeps it behind its
/// queue lock and only holds that lock for a single push, pop or length read,
/// never while a task runs.
pub(crate) struct TaskQueue<T> {
  items: VecDeque<T>,
}

impl<T> TaskQueue<T> {
  /// Creates an empty queue.
  pub(crate) fn new() -> Self {
    Self { items: VecDeque::new() }
  }

  /// Appends an item at the tail. Never fails and never blocks.
  pub(crate) fn push_back(&mut self, item: T) {
    self.items.push_back(item);
  }

  /// Removes the item at the head, or returns `None` when the queue is empty.
  pub(crate) fn pop_front(&mut self) -> Option<T> {
    self.items.pop_front()
  }

  /// Returns the number of items currently held.
  pub(crate) fn len(&self) -> usize {
    self.items.len()
  }
}

impl<T> Default for TaskQueue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for TaskQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskQueue").field("len", &self.len()).finish_non_exhaustive()
  }
}
