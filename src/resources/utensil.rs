use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, Notify};

use crate::engine::StopSignal;
use crate::error::{Result, SimulationError};
use crate::types::{Seat, SimulationEvent};

/// A binary exclusive-access resource shared by two neighbouring philosophers.
///
/// `held` is only ever tested and set under its own mutex, so two acquirers
/// can never both observe it free. Waiters park on `released` instead of
/// spinning and re-test the flag after every release.
#[derive(Debug)]
pub struct Utensil {
    seat: Seat,
    held: Mutex<bool>,
    released: Notify,
    events: broadcast::Sender<SimulationEvent>,
}

impl Utensil {
    pub fn new(seat: Seat, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            seat,
            held: Mutex::new(false),
            released: Notify::new(),
            events,
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Waits until the utensil is free and takes it.
    ///
    /// Fails with [`SimulationError::Cancelled`] if `stop` fires first, in
    /// which case `held` is left untouched.
    pub async fn acquire(&self, stop: &StopSignal) -> Result<()> {
        loop {
            if stop.is_stopped() {
                return Err(SimulationError::Cancelled);
            }

            // Register before testing the flag so a release in between is not lost.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if self.try_acquire() {
                return Ok(());
            }

            tokio::select! {
                _ = &mut released => {}
                _ = stop.stopped() => return Err(SimulationError::Cancelled),
            }
        }
    }

    /// Takes the utensil if it is free, without waiting.
    pub fn try_acquire(&self) -> bool {
        let mut held = self.lock();
        if *held {
            return false;
        }
        *held = true;
        self.publish(true);
        true
    }

    /// Puts the utensil back and wakes every waiter.
    ///
    /// Releasing a free utensil is a caller bug but is tolerated.
    pub fn release(&self) {
        {
            let mut held = self.lock();
            if !*held {
                log::debug!("utensil {} released while already free", self.seat);
            }
            *held = false;
            self.publish(false);
        }
        self.released.notify_waiters();
    }

    pub fn is_held(&self) -> bool {
        *self.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    // Called with the flag locked so published events follow transition order.
    fn publish(&self, held: bool) {
        let _ = self.events.send(SimulationEvent::UtensilChanged {
            seat: self.seat,
            held,
        });
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_try_acquire_and_release() {
        let utensil = Utensil::new(0, 16);
        assert!(!utensil.is_held());

        assert!(utensil.try_acquire());
        assert!(utensil.is_held());
        assert!(!utensil.try_acquire());

        utensil.release();
        assert!(!utensil.is_held());
        assert!(utensil.try_acquire());
    }

    #[test]
    fn test_release_of_free_utensil_is_tolerated() {
        let utensil = Utensil::new(3, 16);
        utensil.release();
        utensil.release();
        assert!(!utensil.is_held());
        assert_eq!(utensil.seat(), 3);
    }

    #[tokio::test]
    async fn test_acquire_free_utensil_returns_immediately() {
        let utensil = Utensil::new(0, 16);
        let stop = StopSignal::new();

        tokio::time::timeout(Duration::from_millis(100), utensil.acquire(&stop))
            .await
            .expect("free utensil should not block")
            .unwrap();
        assert!(utensil.is_held());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_acquire_blocks_until_release() {
        let utensil = Arc::new(Utensil::new(0, 16));
        let stop = StopSignal::new();
        assert!(utensil.try_acquire());

        let waiter = {
            let utensil = utensil.clone();
            let stop = stop.clone();
            tokio::spawn(async move { utensil.acquire(&stop).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        utensil.release();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake on release")
            .unwrap()
            .unwrap();
        assert!(utensil.is_held());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocked_acquire_is_cancelled_without_taking() {
        let utensil = Arc::new(Utensil::new(0, 16));
        let stop = StopSignal::new();
        assert!(utensil.try_acquire());

        let waiter = {
            let utensil = utensil.clone();
            let stop = stop.clone();
            tokio::spawn(async move { utensil.acquire(&stop).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled waiter should return")
            .unwrap();
        assert!(matches!(result, Err(SimulationError::Cancelled)));

        // Still held by the original owner, not by the cancelled waiter.
        assert!(utensil.is_held());
        utensil.release();
        assert!(!utensil.is_held());
    }

    #[tokio::test]
    async fn test_acquire_after_stop_fails_even_when_free() {
        let utensil = Utensil::new(0, 16);
        let stop = StopSignal::new();
        stop.stop();

        let result = utensil.acquire(&stop).await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(!utensil.is_held());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exclusive_access_under_contention() {
        let utensil = Arc::new(Utensil::new(0, 4096));
        let stop = StopSignal::new();
        let mut events = utensil.subscribe();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for worker in 0..8u64 {
            let utensil = utensil.clone();
            let stop = stop.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                for round in 0..20u64 {
                    utensil.acquire(&stop).await.unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_micros((worker * 7 + round) % 50)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    utensil.release();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!utensil.is_held());

        // Published transitions strictly alternate taken / free.
        let mut expected = true;
        let mut seen = 0;
        while let Ok(SimulationEvent::UtensilChanged { held, .. }) = events.try_recv() {
            assert_eq!(held, expected);
            expected = !expected;
            seen += 1;
        }
        assert_eq!(seen, 8 * 20 * 2);
    }
}
