//! One-shot timer scheduling.
//!
//! Components never own a raw tokio task for their timers; they go through
//! [`Scheduler`] so tests can observe every schedule and cancel, and through
//! [`TimerSlot`] so a component never holds more than one live timer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;

/// Work run once when a timer fires.
pub type TimerTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId;

    /// Cancel a pending timer. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        (**self).schedule(delay, task)
    }

    fn cancel(&self, id: TimerId) {
        (**self).cancel(id)
    }
}

// ─── Tokio scheduler ─────────────────────────────────────────────

#[derive(Default)]
struct TimerTable {
    next_id: u64,
    live: HashMap<TimerId, AbortHandle>,
}

/// Scheduler backed by one tokio task per timer.
///
/// Must be used from within a tokio runtime. Honors the paused test clock.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    table: Arc<Mutex<TimerTable>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers scheduled and neither fired nor cancelled.
    pub fn live_count(&self) -> usize {
        self.table.lock().map(|t| t.live.len()).unwrap_or(0)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let Ok(mut table) = self.table.lock() else {
            tracing::error!("timer table poisoned; dropping timer");
            return TimerId(u64::MAX);
        };
        table.next_id += 1;
        let id = TimerId(table.next_id);

        // Deadline is fixed at the call, not when the task is first polled.
        let deadline = tokio::time::Instant::now() + delay;
        let shared = Arc::clone(&self.table);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // Fired timers leave the table before running, so a task that
            // rearms its own owner never aborts itself.
            let still_live = shared
                .lock()
                .map(|mut t| t.live.remove(&id).is_some())
                .unwrap_or(false);
            if still_live {
                task.await;
            }
        });
        table.live.insert(id, handle.abort_handle());
        tracing::debug!(timer = id.0, delay_ms = delay.as_millis() as u64, "timer scheduled");
        id
    }

    fn cancel(&self, id: TimerId) {
        let removed = self
            .table
            .lock()
            .ok()
            .and_then(|mut t| t.live.remove(&id));
        if let Some(handle) = removed {
            handle.abort();
            tracing::debug!(timer = id.0, "timer cancelled");
        }
    }
}

// ─── Single-slot ownership ───────────────────────────────────────

/// Identifies one arming of a [`TimerSlot`]. Passed to the task so it can
/// tell whether it is still the slot's current timer when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmToken(u64);

#[derive(Debug, Clone, Copy)]
struct Armed {
    id: TimerId,
    token: ArmToken,
    fired: bool,
}

/// Owner of at most one pending timer.
///
/// A fired timer stays recorded until the next `rearm` or `clear`, which
/// still issue a (no-op) cancel for it. Every schedule is therefore preceded
/// by a cancel of the previous timer.
pub struct TimerSlot {
    scheduler: Arc<dyn Scheduler>,
    current: Option<Armed>,
    arms: u64,
}

impl TimerSlot {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            current: None,
            arms: 0,
        }
    }

    /// Cancel the current timer, then schedule the one built by `make_task`.
    pub fn rearm<F>(&mut self, delay: Duration, make_task: F) -> ArmToken
    where
        F: FnOnce(ArmToken) -> TimerTask,
    {
        self.clear();
        self.arms += 1;
        let token = ArmToken(self.arms);
        let id = self.scheduler.schedule(delay, make_task(token));
        self.current = Some(Armed {
            id,
            token,
            fired: false,
        });
        token
    }

    /// Cancel without rescheduling.
    pub fn clear(&mut self) {
        if let Some(armed) = self.current.take() {
            self.scheduler.cancel(armed.id);
        }
    }

    /// Called by a task when it fires. Returns false when the slot has been
    /// rearmed or cleared since, in which case the task must do nothing.
    pub fn disarm_fired(&mut self, token: ArmToken) -> bool {
        match self.current.as_mut() {
            Some(armed) if armed.token == token && !armed.fired => {
                armed.fired = true;
                true
            }
            _ => false,
        }
    }

    /// A timer is scheduled and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.current.is_some_and(|armed| !armed.fired)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{advance, settle};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: &Arc<AtomicUsize>) -> TimerTask {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let sched = TokioScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        sched.schedule(Duration::from_secs(5), counting_task(&hits));
        assert_eq!(sched.live_count(), 1);

        advance(Duration::from_millis(4_999)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        advance(Duration::from_millis(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(sched.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let sched = TokioScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let id = sched.schedule(Duration::from_secs(1), counting_task(&hits));
        sched.cancel(id);
        advance(Duration::from_secs(10)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(sched.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_noop() {
        let sched = TokioScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let id = sched.schedule(Duration::ZERO, counting_task(&hits));
        settle().await;
        sched.cancel(id);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_rearm_replaces_pending_timer() {
        let sched: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new(Arc::clone(&sched));

        slot.rearm(Duration::from_secs(1), |_| counting_task(&hits));
        advance(Duration::from_millis(500)).await;
        slot.rearm(Duration::from_secs(1), |_| counting_task(&hits));
        advance(Duration::from_millis(700)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0, "first timer was cancelled");

        advance(Duration::from_millis(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_cancels_before_scheduling() {
        let rec = testing::RecordingScheduler::new();
        let mut slot = TimerSlot::new(Arc::new(rec.clone()));
        let hits = Arc::new(AtomicUsize::new(0));

        slot.rearm(Duration::from_secs(1), |_| counting_task(&hits));
        slot.rearm(Duration::from_secs(2), |_| counting_task(&hits));
        slot.clear();

        let ops = rec.ops();
        assert_eq!(ops.len(), 4);
        let testing::Op::Schedule(first, _) = ops[0] else {
            panic!("expected schedule, got {:?}", ops[0]);
        };
        assert_eq!(ops[1], testing::Op::Cancel(first));
        assert!(matches!(ops[2], testing::Op::Schedule(_, d) if d == Duration::from_secs(2)));
        assert!(matches!(ops[3], testing::Op::Cancel(_)));
        assert_eq!(rec.live_count(), 0);
    }

    #[test]
    fn disarm_fired_rejects_superseded_token() {
        struct Inert;
        impl Scheduler for Inert {
            fn schedule(&self, _delay: Duration, _task: TimerTask) -> TimerId {
                TimerId(0)
            }
            fn cancel(&self, _id: TimerId) {}
        }

        let mut slot = TimerSlot::new(Arc::new(Inert));
        let noop = |_: ArmToken| -> TimerTask { Box::pin(async {}) };
        let old = slot.rearm(Duration::ZERO, noop);
        let new = slot.rearm(Duration::ZERO, noop);

        assert!(!slot.disarm_fired(old));
        assert!(slot.is_armed());
        assert!(slot.disarm_fired(new));
        assert!(!slot.is_armed());
        assert!(!slot.disarm_fired(new));
    }
}
