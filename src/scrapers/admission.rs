//! Admission control for outbound requests.
//!
//! A single counter caps the number of in-flight requests to the origin.
//! Saturated callers sleep one delay interval and try again instead of
//! queuing; origin courtesy is the goal here, not throughput or fairness.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Advisory concurrency gate shared by all fetches of one client.
#[derive(Debug, Clone)]
pub struct Admission {
    max_concurrent: usize,
    retry_delay: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl Admission {
    pub fn new(max_concurrent: usize, retry_delay: Duration) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            retry_delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current number of admitted requests.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until a slot is free, then claim it.
    ///
    /// The returned permit releases the slot on drop, so a panic or early
    /// return inside a fetch cannot leak the counter.
    pub async fn acquire(&self) -> AdmissionPermit {
        loop {
            let current = self.in_flight.load(Ordering::SeqCst);
            if current < self.max_concurrent
                && self
                    .in_flight
                    .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                return AdmissionPermit {
                    in_flight: Arc::clone(&self.in_flight),
                };
            }

            debug!(
                "admission gate saturated ({current}/{}), sleeping {:?}",
                self.max_concurrent, self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

/// Slot held for the duration of one request.
#[derive(Debug)]
pub struct AdmissionPermit {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn permits_release_on_drop() {
        let admission = Admission::new(2, Duration::from_millis(100));

        let a = admission.acquire().await;
        let b = admission.acquire().await;
        assert_eq!(admission.in_flight(), 2);

        drop(a);
        assert_eq!(admission.in_flight(), 1);
        drop(b);
        assert_eq!(admission.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_caller_waits_one_delay_interval() {
        let delay = Duration::from_millis(500);
        let admission = Admission::new(1, delay);

        let held = admission.acquire().await;

        let gate = admission.clone();
        let waiter = tokio::spawn(async move {
            let start = Instant::now();
            let _permit = gate.acquire().await;
            start.elapsed()
        });

        // Let the waiter hit the gate and go to sleep, then free the slot.
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        let waited = waiter.await.unwrap();
        assert!(waited >= delay, "waited only {waited:?}");
    }
}
