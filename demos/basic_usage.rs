use gopool::{Pool, PoolConfig, TaskError};
use std::time::Duration;
use tracing::info;

async fn my_task_fn(id: usize, delay_ms: u64) {
  info!("Task {} starting, will sleep for {}ms", id, delay_ms);
  tokio::time::sleep(Duration::from_millis(delay_ms)).await;
  info!("Task {} finished successfully after {}ms", id, delay_ms);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  // Unbounded: every submission launches its own worker.
  let pool = Pool::new(PoolConfig::new().with_name("basic_pool"));

  for i in 0..5 {
    // Alternate sleep times for variety
    let sleep_duration: u64 = 500 + (i as u64 % 3 * 250);
    pool.go(move |_| my_task_fn(i, sleep_duration));
  }

  info!(
    "All tasks submitted. Workers: {}, queued: {}",
    pool.worker_count(),
    pool.task_count()
  );

  pool.go_err(|_| async move { Err::<(), TaskError>("this failure is only logged".into()) });

  pool.wait().await;
  info!("All tasks finished. Workers still live: {}", pool.worker_count());
  info!("--- Basic Usage Example End ---");
}
