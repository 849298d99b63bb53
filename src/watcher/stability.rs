//! Write-stability waiting.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

/// Timings for [`wait_for_stable_size`].
#[derive(Debug, Clone, Copy)]
pub struct StabilityConfig {
    /// How long the size must stay unchanged.
    pub threshold: Duration,
    /// How often the size is sampled.
    pub poll_interval: Duration,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            threshold: Duration::from_millis(100),
            poll_interval: Duration::from_millis(45),
        }
    }
}

/// Wait until the size of `path` stops changing.
///
/// Returns the settled size, or `None` if the file disappears meanwhile.
pub async fn wait_for_stable_size(path: &Path, config: StabilityConfig) -> Option<u64> {
    let mut last = tokio::fs::metadata(path).await.ok()?.len();
    let mut unchanged_since = Instant::now();

    loop {
        tokio::time::sleep(config.poll_interval).await;
        let size = tokio::fs::metadata(path).await.ok()?.len();
        if size != last {
            last = size;
            unchanged_since = Instant::now();
        } else if unchanged_since.elapsed() >= config.threshold {
            return Some(size);
        }
    }
}
