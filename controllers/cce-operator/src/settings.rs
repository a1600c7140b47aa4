//! Operator tunables.
//!
//! Requeue delays, throttles and retry budgets used by the reconciler. The
//! defaults match the provider's rate limits and typical operation times.

use std::time::Duration;

/// Delays and budgets used across reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Re-check interval while a cluster is being created
    pub creation_poll: Duration,
    /// Re-check interval while the cluster or a node pool is busy
    pub busy_wait: Duration,
    /// Requeue after a round that issued mutating calls
    pub converge_requeue: Duration,
    /// Requeue while node pools drain during teardown
    pub drain_requeue: Duration,
    /// Requeue while the cluster is being deleted
    pub cluster_delete_requeue: Duration,
    /// Requeue between network resource deletions
    pub network_delete_requeue: Duration,
    /// Sleep after recording the same failure twice in a row
    pub duplicate_failure_throttle: Duration,
    /// Pause between dependent network creates (subnet, then NAT)
    pub settle_delay: Duration,
    /// Requeue after a pass with nothing left to do
    pub resync_interval: Duration,
    /// Attempts for a compare-and-swap record write
    pub status_retries: u32,
    /// Lifetime of the CA certificate requested for the endpoint secret, in days
    pub ca_cert_days: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            creation_poll: Duration::from_secs(30),
            busy_wait: Duration::from_secs(30),
            converge_requeue: Duration::from_secs(10),
            drain_requeue: Duration::from_secs(10),
            cluster_delete_requeue: Duration::from_secs(20),
            network_delete_requeue: Duration::from_secs(5),
            duplicate_failure_throttle: Duration::from_secs(5),
            settle_delay: Duration::from_secs(5),
            resync_interval: Duration::from_secs(300),
            status_retries: 5,
            ca_cert_days: 3 * 365,
        }
    }
}
