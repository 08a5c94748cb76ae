//! Shared helpers for `stagerun` integration tests.

pub mod builders;
pub mod recorder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// How long [`with_timeout`] waits before failing a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured by the harness and only shown for failing tests.
/// `STAGERUN_LOG=debug` raises the level; the default is `warn` so step
/// failures that tests provoke on purpose stay visible when they matter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(stagerun::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Fail the test if `f` takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(f: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(out) => out,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}"),
    }
}

/// Build a parameter map from `(name, value)` pairs, keeping their order.
pub fn params<I, K, V>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
