//! Utilities for executing/spawning async tasks.

use std::time::Duration;

use eyre::Context;
use futures::Future;

use crate::{retry::ExponentialBackoff, time};

/// In a loop, runs a future created by `run`, logs an error if it occurs, and retries
/// after an exponentially increasing delay. In parallel using a `select!`, it listens
/// to `shutdown_rx` and cancels the loop if a shutdown message has been broadcast.
pub async fn run_retry_log_errors<F, FUT>(
    run: F,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    time: &dyn time::Port,
) where
    F: Fn() -> FUT,
    FUT: Future<Output = eyre::Result<()>>,
{
    let run_loop = async move {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60))
            .expect("Invalid backoff");
        loop {
            if let Err(error) = run().await {
                tracing::error!("{:?}", error);
                backoff.sleep(time).await;
                tracing::warn!("Retrying...");
            } else {
                backoff.reset();
            }
        }
    };

    tokio::select! {
        result = shutdown_rx.recv() => {
            tracing::debug!("Received shutdown broadcast");
            let result = result.wrap_err("Error receiving shutdown message");
            if let Err(error) = &result {
                tracing::error!("{:?}", error);
            }
        }
        _ = run_loop => {}
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use crate::time;

    use super::run_retry_log_errors;

    #[tokio::test]
    async fn test_stops_on_shutdown_broadcast() {
        let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
        shutdown_tx.send(()).unwrap();

        let run = || async {
            futures::future::pending::<()>().await;
            Ok(())
        };

        // Returns promptly because the shutdown message is already queued.
        tokio::time::timeout(
            Duration::from_secs(1),
            run_retry_log_errors(run, shutdown_rx, &time::Gateway),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_retries_after_error() {
        let (_shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

        let attempts = AtomicUsize::new(0);
        let run = || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            if attempt == 0 {
                eyre::bail!("simulated failure");
            }
            futures::future::pending::<()>().await;
            Ok(())
        };

        let mut t = time::MockPort::new();
        t.expect_async_sleep().times(1).returning(|_| {});

        // The loop never finishes on its own, the timeout cuts it short after
        // the retry has been observed.
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            run_retry_log_errors(run, shutdown_rx, &t),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(2, attempts.load(Ordering::SeqCst));
    }
}
