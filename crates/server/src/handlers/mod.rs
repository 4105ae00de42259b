//! API handlers module

pub mod health;
pub mod inspect;
pub mod rank;
pub mod stats;

use sanity_common::errors::{AppError, Result};
use std::time::Duration;

/// Run store reads and ranking work off the async runtime, bounded by `limit`.
///
/// The blocking task itself cannot be cancelled; on timeout it keeps
/// running to completion and its result is discarded.
pub async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(AppError::Internal {
            message: format!("ranking task failed: {}", e),
        }),
        Err(_) => Err(AppError::Timeout {
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanity_common::errors::ErrorCode;

    #[tokio::test]
    async fn test_run_blocking_returns_result() {
        let value = run_blocking(Duration::from_secs(5), || Ok(41 + 1)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_blocking_times_out() {
        let err = run_blocking(Duration::from_millis(10), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);
    }
}
