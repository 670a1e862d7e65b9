pub mod builders;
pub mod fake_queue;
pub mod memory_oracle;

use std::sync::Once;
use std::time::Duration;

use batchdag::config::SchedulerSettings;
use tracing_subscriber::{fmt, EnvFilter};

pub use fake_queue::{Behaviour, FakeQueue, QueueEvent};
pub use memory_oracle::MemoryOracle;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Scheduler settings with millisecond waits and the given ceiling.
pub fn fast_settings(max_queued_jobs: usize) -> SchedulerSettings {
    SchedulerSettings {
        max_queued_jobs,
        throttle_interval: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
        failure_confirm_delay: Duration::from_millis(2),
    }
}
