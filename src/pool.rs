use crate::completion::CompletionTracker;
use crate::config::{PoolConfig, DEFAULT_POOL_NAME};
use crate::controller::{WorkerCap, WorkerController};
use crate::error::{PoolError, TaskError};
use crate::fault::{self, Fault, RecoverFn};
use crate::signals::{self, Signal};
use crate::task::QueuedTask;
use crate::task_queue::TaskQueue;

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_POOL_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// A worker pool that runs submitted tasks on Tokio tasks.
///
/// Submitted tasks go into a FIFO queue. On every submission the pool decides
/// whether to launch another worker: always while the cap is unbounded,
/// otherwise only while fewer than `cap` workers are live. A worker pulls
/// tasks until the queue is empty, then exits. There is no idle worker and no
/// scheduler task.
///
/// Every task receives the pool's shutdown token. A task that panics is
/// isolated and reported to the recovery callback; a task that returns an
/// error is logged. Neither affects other tasks or the worker that ran it.
pub struct Pool {
  pool_name: Arc<String>,
  queue: Mutex<TaskQueue<QueuedTask>>,
  controller: WorkerController,
  tracker: Arc<CompletionTracker>,
  shutdown_token: CancellationToken,
  recover: RecoverFn,
  runtime: Option<TokioHandle>,
}

impl Pool {
  pub fn new(config: PoolConfig) -> Arc<Self> {
    let PoolConfig {
      name,
      parent_token,
      worker_cap,
      recover,
      runtime,
    } = config;

    let pool_name = Arc::new(name.unwrap_or_else(|| DEFAULT_POOL_NAME.to_string()));
    let shutdown_token = match parent_token {
      Some(parent) => parent.child_token(),
      None => CancellationToken::new(),
    };
    let recover = recover.unwrap_or_else(|| fault::log_fault(pool_name.clone()));

    debug!(pool_name = %*pool_name, cap = %worker_cap, "Pool created.");

    Arc::new(Self {
      pool_name,
      queue: Mutex::new(TaskQueue::new()),
      controller: WorkerController::new(worker_cap),
      tracker: CompletionTracker::new(),
      shutdown_token,
      recover,
      runtime,
    })
  }

  /// An unbounded pool with a fresh root token and logging recovery.
  pub fn with_defaults() -> Arc<Self> {
    Self::new(PoolConfig::default())
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  /// Submits a task that cannot fail.
  ///
  /// Outside a Tokio runtime, with no runtime configured, the task is queued
  /// without a worker. The next submission made from within a runtime picks
  /// it up.
  pub fn go<F, Fut>(self: &Arc<Self>, f: F)
  where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    self.go_err(move |token| async move {
      f(token).await;
      Ok::<(), TaskError>(())
    });
  }

  /// Submits a task that may return an error. The error is logged and
  /// otherwise dropped; nothing is reported back to the caller.
  ///
  /// Never blocks and never fails: the queue is unbounded. See [`Pool::go`]
  /// for submissions made outside a runtime.
  pub fn go_err<F, Fut>(self: &Arc<Self>, f: F)
  where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
  {
    // Registered before the task is visible in the queue, so `wait` can
    // never observe zero for work that is about to run.
    let completion = self.tracker.register();
    let task_id = NEXT_POOL_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let task = QueuedTask::new(task_id, completion, f);
    let runtime = self.runtime_handle();

    let (spawn, queued) = {
      let mut queue = self.queue.lock();
      queue.push_back(task);
      (runtime.is_some() && self.controller.claim_on_submit(), queue.len())
    };

    trace!(pool_name = %*self.pool_name, %task_id, queued, spawn, "Task queued.");

    match runtime {
      Some(handle) if spawn => self.spawn_worker(&handle),
      Some(_) => {}
      None => warn!(
        pool_name = %*self.pool_name,
        %task_id,
        queued,
        "No Tokio runtime available. Task stays queued until a submission from within a runtime launches a worker."
      ),
    }
  }

  /// Resolves once every task submitted so far has finished.
  ///
  /// Tasks submitted while waiting extend the wait. Nothing is cancelled.
  pub async fn wait(&self) {
    self.tracker.wait_idle().await;
  }

  /// Blocking form of [`Pool::wait`] for callers outside async code.
  ///
  /// Parks the calling thread. Do not call it from a task running on the
  /// pool's own runtime: on a current-thread runtime the workers could never
  /// make progress.
  pub fn wait_blocking(&self) {
    futures::executor::block_on(self.wait());
  }

  /// Graceful shutdown on an OS signal.
  ///
  /// Waits until one of `signals` arrives (interrupt or terminate when the
  /// slice is empty), cancels the shared token so tasks can wind down, then
  /// waits for every outstanding task. Returns the signal that fired.
  ///
  /// # Errors
  /// Returns [`PoolError::SignalRegistration`] if a listener cannot be
  /// installed and [`PoolError::UnsupportedSignal`] for a signal the platform
  /// does not deliver. Nothing is cancelled in either case.
  pub async fn wait_signal(&self, signals: &[Signal]) -> Result<Signal, PoolError> {
    let listener = signals::listen(signals)?;
    debug!(pool_name = %*self.pool_name, ?listener, "Waiting for shutdown signal.");
    let received = self
      .shutdown_on(async move {
        let received = listener.recv().await;
        info!("Received {}.", received);
        received
      })
      .await;
    Ok(received)
  }

  /// Graceful shutdown on an arbitrary event.
  ///
  /// Runs three phases in order: await `event`, cancel the shared token,
  /// wait for every outstanding task. Returns the event's output.
  pub async fn shutdown_on<E>(&self, event: E) -> E::Output
  where
    E: Future,
  {
    let output = event.await;

    info!(
      pool_name = %*self.pool_name,
      outstanding = self.outstanding_count(),
      "Initiating graceful shutdown: cancelling shared token."
    );
    self.shutdown_token.cancel();

    self.wait().await;
    info!(pool_name = %*self.pool_name, "Graceful shutdown completed: all tasks finished.");
    output
  }

  /// Changes the worker cap. Negative integers mean unbounded.
  ///
  /// A raise launches workers right away, up to `min(cap, queued tasks)`.
  /// A cut is lazy: running workers keep going until the queue drains.
  /// With an empty queue nothing is launched however high the cap goes, and
  /// switching to unbounded launches nothing either. In both cases new
  /// workers only appear with the next submissions.
  pub fn set_worker_cap(self: &Arc<Self>, cap: impl Into<WorkerCap>) {
    let cap = cap.into();
    let runtime = self.runtime_handle();
    let missing = {
      let queue = self.queue.lock();
      self.controller.set_cap(cap);
      match runtime {
        Some(_) => self.controller.claim_for_backlog(queue.len()),
        None => 0,
      }
    };

    debug!(pool_name = %*self.pool_name, %cap, launching = missing, "Worker cap changed.");

    if let Some(handle) = runtime {
      for _ in 0..missing {
        self.spawn_worker(&handle);
      }
    }
  }

  pub fn worker_cap(&self) -> WorkerCap {
    self.controller.cap()
  }

  /// Number of live workers.
  pub fn worker_count(&self) -> usize {
    self.controller.worker_count()
  }

  /// Number of tasks waiting in the queue, not counting running ones.
  pub fn task_count(&self) -> usize {
    self.queue.lock().len()
  }

  /// Number of submitted tasks that have not finished, queued or running.
  pub fn outstanding_count(&self) -> usize {
    self.tracker.outstanding()
  }

  /// Cancels the shared token without waiting.
  pub fn cancel(&self) {
    self.shutdown_token.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.shutdown_token.is_cancelled()
  }

  /// A clone of the token every task receives.
  pub fn token(&self) -> CancellationToken {
    self.shutdown_token.clone()
  }

  /// The configured runtime, else the ambient one. Resolved before a worker
  /// is counted so a count never exists without a runtime to run it.
  fn runtime_handle(&self) -> Option<TokioHandle> {
    self.runtime.clone().or_else(|| TokioHandle::try_current().ok())
  }

  fn spawn_worker(self: &Arc<Self>, runtime: &TokioHandle) {
    // Built outside the future: if the runtime drops it unpolled, the slot
    // still gives the count back.
    let mut slot = WorkerSlot {
      pool: Arc::clone(self),
      counted: true,
    };
    let worker = async move {
      let pool = Arc::clone(&slot.pool);
      pool.run_worker(&mut slot).await
    }
    .instrument(info_span!("pool_worker", pool_name = %*self.pool_name));

    runtime.spawn(worker);
  }

  async fn run_worker(&self, slot: &mut WorkerSlot) {
    trace!(workers = self.worker_count(), "Worker started.");
    loop {
      let next = {
        let mut queue = self.queue.lock();
        let next = queue.pop_front();
        if next.is_none() {
          // Decided under the lock so a submitter that saw this worker as
          // live has already made its task visible to it.
          self.controller.release();
          slot.counted = false;
        }
        next
      };

      match next {
        Some(task) => self.run_task(task).await,
        None => break,
      }
    }
    trace!(workers = self.worker_count(), "Queue drained. Worker exiting.");
  }

  async fn run_task(&self, task: QueuedTask) {
    let task_id = task.task_id;
    let (body, completion) = task.into_parts(self.shutdown_token.clone());

    match AssertUnwindSafe(body).catch_unwind().await {
      Ok(Ok(())) => {
        trace!(%task_id, "Task executed successfully.");
      }
      Ok(Err(task_error)) => {
        error!(pool_name = %*self.pool_name, %task_id, error = %task_error, "Task returned an error.");
      }
      Err(panic_payload) => {
        let fault = Fault::new(task_id, panic_payload);
        let token = &self.shutdown_token;
        if std::panic::catch_unwind(AssertUnwindSafe(|| (self.recover)(token, fault))).is_err() {
          error!(pool_name = %*self.pool_name, %task_id, "The recovery callback panicked while handling a task panic.");
        }
      }
    }

    // Only now does `wait` see this task as finished, so the recovery
    // callback and logging above happen-before it returns.
    drop(completion);
  }
}

/// A live worker's share of the worker count.
struct WorkerSlot {
  pool: Arc<Pool>,
  counted: bool,
}

impl Drop for WorkerSlot {
  fn drop(&mut self) {
    if self.counted {
      // The worker future was dropped before it drained the queue, e.g. by a
      // runtime shutting down.
      let _queue = self.pool.queue.lock();
      self.pool.controller.release();
      warn!(
        pool_name = %*self.pool.pool_name,
        workers = self.pool.worker_count(),
        "Worker dropped before draining the queue."
      );
    }
  }
}

impl fmt::Debug for Pool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pool")
      .field("pool_name", &self.pool_name)
      .field("controller", &self.controller)
      .field("queue", &*self.queue.lock())
      .field("tracker", &self.tracker)
      .field("cancelled", &self.shutdown_token.is_cancelled())
      .finish_non_exhaustive()
  }
}
