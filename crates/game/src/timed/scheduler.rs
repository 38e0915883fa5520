use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Default)]
struct TimerState {
    pending: Mutex<HashMap<TimerHandle, AbortHandle>>,
    next_id: AtomicU64,
}

impl TimerState {
    fn take(&self, handle: TimerHandle) -> Option<AbortHandle> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
    }
}

/// One-shot timers on the tokio runtime.
///
/// A callback fires at most once. Firing and cancelling race on the same map
/// entry, so whichever removes it first wins; a cancel that loses is a no-op.
/// Callbacks run on their own task and a panicking callback only takes down
/// that task.
#[derive(Clone, Default)]
pub struct TimerService {
    state: Arc<TimerState>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` at or after the wall-clock time `run_at`.
    pub fn register<F, Fut>(&self, run_at: SystemTime, callback: F) -> TimerHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = run_at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        self.register_after(delay, callback)
    }

    pub fn register_after<F, Fut>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = TimerHandle(self.state.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::clone(&self.state);

        // Hold the map lock across spawn so the task cannot look itself up
        // before it has been recorded.
        let mut pending = self
            .state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if state.take(handle).is_none() {
                return;
            }
            log::debug!("timer {:?} fired", handle);
            if let Err(e) = tokio::spawn(callback()).await {
                log::error!("timer {:?} callback failed: {}", handle, e);
            }
        });
        pending.insert(handle, task.abort_handle());
        handle
    }

    /// Returns `true` if the timer was still pending and will now never fire.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        match self.state.take(handle) {
            Some(task) => {
                task.abort();
                log::debug!("timer {:?} cancelled", handle);
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[tokio::test]
    async fn test_fires_after_delay() {
        let timers = TimerService::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let start = Instant::now();
        timers.register_after(Duration::from_millis(50), move || async move {
            let _ = tx.send(Instant::now());
        });
        let fired_at = rx.await.unwrap();
        assert!(fired_at.duration_since(start) >= Duration::from_millis(50));
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_fire() {
        let timers = TimerService::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let handle = timers.register_after(Duration::from_millis(30), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timers.cancel(handle));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_fire_is_noop() {
        let timers = TimerService::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = timers.register_after(Duration::ZERO, move || async move {
            let _ = tx.send(());
        });
        rx.await.unwrap();
        assert!(!timers.cancel(handle));
    }

    #[tokio::test]
    async fn test_past_deadline_fires_immediately() {
        let timers = TimerService::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        timers.register(SystemTime::now() - Duration::from_secs(5), move || async move {
            let _ = tx.send(());
        });
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_panicking_callback_is_isolated() {
        let timers = TimerService::new();
        timers.register_after(Duration::ZERO, || async { panic!("boom") });
        let (tx, rx) = tokio::sync::oneshot::channel();
        timers.register_after(Duration::from_millis(10), move || async move {
            let _ = tx.send(());
        });
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
    }
}
