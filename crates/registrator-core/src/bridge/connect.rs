use super::Bridge;
use crate::config::RetryPolicy;
use crate::{Error, Result};

impl Bridge {
    /// Ping the backend until it answers or the retry budget is spent.
    ///
    /// Attempts are numbered from 0; with `Limited(n)` the last attempt is
    /// number `n`, so up to `n + 1` pings are made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnreachable`] with the last ping error once
    /// the final attempt fails.
    pub async fn connect(&self, policy: &RetryPolicy) -> Result<()> {
        let mut attempt: u64 = 0;
        loop {
            tracing::info!(attempt, max = ?policy.attempts, "connecting to backend");
            match self.registry.ping().await {
                Ok(()) => return Ok(()),
                Err(source) if policy.is_last(attempt) => {
                    return Err(Error::BackendUnreachable {
                        attempts: attempt + 1,
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "backend ping failed, retrying");
                    tokio::time::sleep(policy.interval).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
