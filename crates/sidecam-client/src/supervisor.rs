//! Auto-reconnect supervisor for stream tasks.

use std::fmt::Display;
use std::future::Future;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::connection::BackoffPolicy;

/// Re-run `operation` until it completes normally or is cancelled.
///
/// Any error (including abrupt stream termination) triggers a wait of the
/// current backoff delay followed by a fresh invocation, looping indefinitely.
/// Normal completion ends the loop without retry. Both the operation and the
/// backoff wait observe the shutdown signal, so cancellation never waits out
/// an in-progress delay.
pub(crate) async fn auto_reconnect<F, Fut, E>(
    context: &'static str,
    policy: BackoffPolicy,
    mut shutdown: watch::Receiver<bool>,
    mut operation: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut delay = policy.initial_delay();

    loop {
        if *shutdown.borrow() {
            debug!("{context} cancelled");
            return;
        }

        debug!("Starting {context}");
        tokio::select! {
            result = operation() => match result {
                Ok(()) => {
                    info!("{context} completed normally");
                    return;
                }
                Err(e) => {
                    error!("{context} error: {e}, retrying in {delay:?}");
                }
            },
            _ = shutdown.changed() => {
                debug!("{context} cancelled");
                return;
            }
        }

        tokio::select! {
            _ = sleep(delay) => {}
            _ = shutdown.changed() => {
                debug!("{context} cancelled during backoff");
                return;
            }
        }
        delay = policy.next_delay(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_retry_delays_follow_backoff() {
        let attempts = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (_tx, rx) = watch::channel(false);

        let attempts_in = Arc::clone(&attempts);
        let starts_in = Arc::clone(&starts);
        auto_reconnect("test stream", BackoffPolicy::default(), rx, move || {
            let attempts = Arc::clone(&attempts_in);
            let starts = Arc::clone(&starts_in);
            async move {
                starts.lock().push(Instant::now());
                if attempts.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err("boom")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);

        // Paused time advances exactly by each sleep: 1s, 2s, 4s.
        let starts = starts.lock();
        assert_eq!(starts[1] - starts[0], Duration::from_secs(1));
        assert_eq!(starts[2] - starts[1], Duration::from_secs(2));
        assert_eq!(starts[3] - starts[2], Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_completion_ends_loop() {
        let attempts = Arc::new(AtomicU32::new(0));
        let (_tx, rx) = watch::channel(false);

        let attempts_in = Arc::clone(&attempts);
        auto_reconnect("test stream", BackoffPolicy::default(), rx, move || {
            let attempts = Arc::clone(&attempts_in);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<(), &str>(())
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let (tx, rx) = watch::channel(false);

        let supervisor = tokio::spawn(auto_reconnect(
            "test stream",
            BackoffPolicy {
                floor: Duration::from_secs(3600),
                ceiling: Duration::from_secs(3600),
            },
            rx,
            || async { Err::<(), _>("boom") },
        ));

        // Let the first failure land and the backoff wait begin.
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        // Far less than the hour-long delay.
        tokio::time::timeout(Duration::from_secs(5), supervisor)
            .await
            .expect("supervisor should exit promptly on cancellation")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_runs() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_in = Arc::clone(&attempts);
        auto_reconnect("test stream", BackoffPolicy::default(), rx, move || {
            let attempts = Arc::clone(&attempts_in);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<(), &str>(())
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }
}
