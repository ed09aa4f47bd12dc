use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

/// Ceiling on the number of concurrently live workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerCap {
  /// Every submission launches its own worker.
  #[default]
  Unbounded,
  /// At most this many workers are spawned by the pool. A limit of zero
  /// still admits one worker while none is live, so queued work is never
  /// stranded.
  Limited(usize),
}

const UNBOUNDED: i64 = -1;

impl WorkerCap {
  fn encode(self) -> i64 {
    match self {
      WorkerCap::Unbounded => UNBOUNDED,
      WorkerCap::Limited(n) => i64::try_from(n).unwrap_or(i64::MAX),
    }
  }

  fn decode(raw: i64) -> Self {
    match usize::try_from(raw) {
      Ok(n) => WorkerCap::Limited(n),
      Err(_) => WorkerCap::Unbounded,
    }
  }

  /// How many workers the current backlog justifies under this cap. Going
  /// unbounded launches nothing; later submissions add the workers.
  fn target(self, queued: usize) -> usize {
    match self {
      WorkerCap::Unbounded => 0,
      WorkerCap::Limited(n) => n.min(queued),
    }
  }
}

/// Negative values mean unbounded.
impl From<i32> for WorkerCap {
  fn from(n: i32) -> Self {
    Self::decode(i64::from(n))
  }
}

impl From<Option<usize>> for WorkerCap {
  fn from(n: Option<usize>) -> Self {
    n.map_or(WorkerCap::Unbounded, WorkerCap::Limited)
  }
}

impl fmt::Display for WorkerCap {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkerCap::Unbounded => f.write_str("unbounded"),
      WorkerCap::Limited(n) => write!(f, "{n}"),
    }
  }
}

/// Owns the live-worker counter and the cap, and makes the spawn decisions.
///
/// Both values are atomics so observers never take a lock. The pool calls
/// every `claim_*`/`release` method while holding its queue lock, which keeps
/// the decisions consistent with the queue contents: a spawn decision may
/// over-provision, but a non-empty queue is never left without a live worker.
pub(crate) struct WorkerController {
  cap: AtomicI64,
  workers: AtomicUsize,
}

impl WorkerController {
  pub(crate) fn new(cap: WorkerCap) -> Self {
    Self {
      cap: AtomicI64::new(cap.encode()),
      workers: AtomicUsize::new(0),
    }
  }

  pub(crate) fn cap(&self) -> WorkerCap {
    WorkerCap::decode(self.cap.load(Ordering::Acquire))
  }

  pub(crate) fn set_cap(&self, cap: WorkerCap) {
    self.cap.store(cap.encode(), Ordering::Release);
  }

  pub(crate) fn worker_count(&self) -> usize {
    self.workers.load(Ordering::Acquire)
  }

  /// The submission-time spawn rule.
  fn admits_another(&self) -> bool {
    let live = self.worker_count();
    live == 0
      || match self.cap() {
        WorkerCap::Unbounded => true,
        WorkerCap::Limited(n) => live < n,
      }
  }

  /// Called after a task has been appended. Returns `true` when the caller
  /// must launch one new worker, which is already counted.
  pub(crate) fn claim_on_submit(&self) -> bool {
    if self.admits_another() {
      self.workers.fetch_add(1, Ordering::AcqRel);
      true
    } else {
      false
    }
  }

  /// Called after a cap change. Returns how many workers the caller must
  /// launch (already counted) to meet `min(cap, queued)`.
  ///
  /// Lowering the cap never stops anyone. Nothing is launched with an empty
  /// queue however high the cap goes, nor when the cap becomes unbounded.
  pub(crate) fn claim_for_backlog(&self, queued: usize) -> usize {
    let missing = self.cap().target(queued).saturating_sub(self.worker_count());
    if missing > 0 {
      self.workers.fetch_add(missing, Ordering::AcqRel);
    }
    missing
  }

  /// A worker found the queue empty and is exiting.
  pub(crate) fn release(&self) {
    self.workers.fetch_sub(1, Ordering::AcqRel);
  }
}

impl fmt::Debug for WorkerController {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkerController")
      .field("cap", &self.cap())
      .field("workers", &self.worker_count())
      .finish()
  }
}
