//! Periodic eviction of finished live run entries.
//!
//! Finished runs stay in the live registry for a grace period so late
//! stream subscribers still get a replay; after that the persisted record
//! is the only source. This task sweeps expired entries on a fixed
//! interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use runforge_live::LiveRunRegistry;
use tokio_util::sync::CancellationToken;

/// Run the registry sweep loop.
///
/// Evicts finished entries older than `retention` every `interval`. Runs
/// until `cancel` is triggered.
pub async fn run(
    registry: Arc<LiveRunRegistry>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = interval.as_secs(),
        "Live registry sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Live registry sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                let evicted = registry.sweep_finished(retention).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Live registry sweep: evicted finished runs");
                } else {
                    tracing::debug!("Live registry sweep: nothing to evict");
                }
            }
        }
    }
}
