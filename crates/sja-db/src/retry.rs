//! Bounded exponential-backoff retry for transient database errors.
//!
//! Only connection-level faults are retried; syntax errors and constraint
//! violations propagate on the first attempt.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

const BACKOFF: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

/// Retries `op` up to `BACKOFF.len()` additional times when the returned
/// error is transient, sleeping `BACKOFF[attempt]` between attempts.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < BACKOFF.len() && is_transient(&e) => {
                tokio::time::sleep(BACKOFF[attempt]).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Io(_)) | Some(sqlx::Error::PoolTimedOut)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_immediately_when_op_succeeds() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_transient_errors_do_not_retry() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("boom"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
