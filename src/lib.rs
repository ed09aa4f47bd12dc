//! A Tokio-based worker pool with a live-adjustable worker cap, per-task
//! panic isolation and signal-driven graceful shutdown.
//!
//! ```no_run
//! use gopool::{Pool, PoolConfig};
//!
//! # async fn run() {
//! let pool = Pool::new(PoolConfig::new().with_name("jobs").with_worker_cap(4));
//! for i in 0..10 {
//!   pool.go(move |token| async move {
//!     if !token.is_cancelled() {
//!       println!("job {i}");
//!     }
//!   });
//! }
//! pool.wait().await;
//! # }
//! ```

mod cache;
mod completion;
mod config;
mod controller;
mod error;
mod fault;
pub mod global;
mod pool;
mod signals;
mod task;
mod task_queue;

pub use cache::{CacheConfig, TtlCache};
pub use config::PoolConfig;
pub use controller::WorkerCap;
pub use error::{PoolError, TaskError};
pub use fault::{Fault, RecoverFn};
pub use pool::Pool;
pub use signals::Signal;
pub use tokio_util::sync::CancellationToken;
