use std::time::Duration;

/// Configuration for the store's background sweep task
///
/// # Example
///
/// ```rust
/// use cachedb_core::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_sweep_interval(Duration::from_millis(500))
///     .with_shutdown_grace(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Interval between sweeps (default: 1 second)
    pub sweep_interval: Duration,
    /// How long `shutdown` waits for the sweep task before aborting it (default: 5 seconds)
    pub shutdown_grace: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sweep interval
    ///
    /// This determines how often the background task physically removes expired entries.
    /// Reads hide expired entries regardless of this value.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the shutdown grace period
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
