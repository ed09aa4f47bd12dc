use gopool::{Pool, PoolConfig};
use std::time::{Duration, Instant};
use tracing::info;

async fn long_task_fn(id: usize) {
  info!("Task {} starting (should take 1s)", id);
  tokio::time::sleep(Duration::from_secs(1)).await;
  info!("Task {} finished", id);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Worker Cap Example (cap: 2, raised to 4) ---");

  let pool = Pool::new(PoolConfig::new().with_name("capped_pool").with_worker_cap(2));
  let started = Instant::now();

  let num_tasks = 8;
  for i in 0..num_tasks {
    pool.go(move |_| long_task_fn(i));
  }
  info!(
    "Submitted {} tasks. Workers: {}, queued: {}",
    num_tasks,
    pool.worker_count(),
    pool.task_count()
  );

  tokio::time::sleep(Duration::from_millis(1500)).await;
  info!(
    "Raising cap to 4. Workers before: {}, queued: {}",
    pool.worker_count(),
    pool.task_count()
  );
  pool.set_worker_cap(4);
  info!("Workers after: {}", pool.worker_count());

  pool.wait().await;
  info!("All {} tasks finished in {:.1?}", num_tasks, started.elapsed());

  // Raising the cap on an idle pool launches nothing until work arrives.
  pool.set_worker_cap(16);
  info!("Idle pool with cap 16 has {} workers", pool.worker_count());
  info!("--- Worker Cap Example End ---");
}
