//! Counts live connections so shutdown can wait for them to finish.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Active {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Active {
    fn count(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared count of connections still being served.
#[derive(Debug, Clone, Default)]
pub(super) struct ConnectionTracker(Arc<Active>);

impl ConnectionTracker {
    /// Marks a connection as live until the returned guard drops.
    pub(super) fn enter(&self) -> ActiveConnection {
        *self.0.count() += 1;
        ActiveConnection(Arc::clone(&self.0))
    }

    /// Blocks until no connection is live or `timeout` passes.
    ///
    /// Returns the number still live on timeout.
    pub(super) fn wait_idle(&self, timeout: Duration) -> Result<(), usize> {
        let guard = self.0.count();
        let (guard, _) = self
            .0
            .idle
            .wait_timeout_while(guard, timeout, |live| *live > 0)
            .unwrap_or_else(PoisonError::into_inner);
        match *guard {
            0 => Ok(()),
            live => Err(live),
        }
    }
}

/// Guard held by a connection worker for the lifetime of its connection.
#[derive(Debug)]
pub(super) struct ActiveConnection(Arc<Active>);

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        let mut count = self.0.count();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn idle_tracker_returns_immediately() {
        let tracker = ConnectionTracker::default();
        let started = Instant::now();
        assert_eq!(tracker.wait_idle(Duration::from_secs(5)), Ok(()));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn waits_for_guards_released_elsewhere() {
        let tracker = ConnectionTracker::default();
        let first = tracker.enter();
        let second = tracker.enter();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(first);
            drop(second);
        });
        assert_eq!(tracker.wait_idle(Duration::from_secs(5)), Ok(()));
        worker.join().expect("worker join");
    }

    #[test]
    fn reports_connections_left_after_timeout() {
        let tracker = ConnectionTracker::default();
        let _held = tracker.enter();
        let _also_held = tracker.enter();
        assert_eq!(tracker.wait_idle(Duration::from_millis(20)), Err(2));
    }
}
