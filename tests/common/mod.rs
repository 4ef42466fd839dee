use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Route library logs to the test harness; `RUST_LOG=taskq=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `cond` until it holds, panicking after [`TIMEOUT`].
pub fn wait_until<F: FnMut() -> bool>(what: &str, mut cond: F) {
    let deadline = Instant::now() + TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(1));
    }
}
