//! Deadline helper for network-bound steps.

use std::future::Future;
use std::time::Duration;

use crate::error::PlanxError;

/// Run `future` under a deadline, mapping expiry to [`PlanxError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, PlanxError>>,
) -> Result<T, PlanxError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(PlanxError::Timeout(
            u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
