//! Per-suspension-point timeout and cooperative cancellation (//! "every suspension point has an explicit timeout"; "cancellation is
//! cooperative — the in-flight step finishes its atomic sub-operation,
//! logs a cancel event, and returns").

use std::future::Future;
use std::time::Duration;
use taxorag_core::error::{CoreError, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Race a suspension point against its configured timeout and the
/// request's cancellation token.
///
/// # Errors
/// `CoreError::TimedOut` if `duration` elapses first, `CoreError::Cancelled`
/// if `cancel` fires first, otherwise the future's own result.
pub async fn with_timeout<F, T>(
    step: &str,
    duration: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!(step, "cancellation observed, step returning early");
            Err(CoreError::Cancelled)
        }
        result = fut => result,
        () = tokio::time::sleep(duration) => Err(CoreError::TimedOut {
            elapsed_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_future_wins_against_timeout() {
        let cancel = CancellationToken::new();
        let result = with_timeout("test", Duration::from_millis(200), &cancel, async {
            Ok::<_, CoreError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn slow_future_times_out() {
        let cancel = CancellationToken::new();
        let result = with_timeout("test", Duration::from_millis(10), &cancel, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CoreError>(42)
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "timed_out");
    }

    #[tokio::test]
    async fn cancellation_preempts_a_pending_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = with_timeout("test", Duration::from_secs(5), &cancel, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CoreError>(42)
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "cancelled");
    }
}
