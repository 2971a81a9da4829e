//! Client-side polling.

use std::future::Future;

use anyhow::Result;

use crate::domain::poll::PollPolicy;

/// Probe up to `policy.attempts` times, sleeping `policy.interval` between
/// probes. Returns `true` as soon as a probe does, `false` when attempts run
/// out. A probe error aborts the wait.
///
/// # Errors
///
/// Propagates the first probe error.
pub async fn poll_until<F, Fut>(policy: PollPolicy, mut probe: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 0..policy.attempts {
        if attempt > 0 && !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
        if probe().await? {
            return Ok(true);
        }
    }
    Ok(false)
}
