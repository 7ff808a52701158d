//! Connection status poller.
//!
//! Keeps an eventually-consistent local view of the remote connection and
//! drives QR pairing to completion. All decisions live in
//! [`StatusTracker`]; this module only does IO, timers and publication.
//!
//! Invariants:
//! - at most one live timer, every reschedule goes through [`TimerSlot::rearm`]
//! - results of superseded requests never reach the published view
//! - nothing is applied or scheduled after [`StatusPoller::unmount`]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use propdash_api::{ApiError, ConnectionAdmin, StatusSource};
use propdash_core::types::ActionResult;
use propdash_core::{ConnectionStatus, PollCadence, StatusPayload};
use tokio::sync::watch;

use crate::error::PollerError;
use crate::scheduler::{ArmToken, Scheduler, TimerSlot, TimerTask};
use crate::tracker::{Applied, PollerView, RequestTicket, RetryPolicy, StatusTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub cadence: PollCadence,
    pub retry: RetryPolicy,
    /// Start pairing automatically when the first snapshot shows an
    /// unlinked account.
    pub auto_start: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            cadence: PollCadence::default(),
            retry: RetryPolicy::default(),
            auto_start: true,
        }
    }
}

struct PollState {
    tracker: StatusTracker,
    slot: TimerSlot,
    mounted: bool,
}

struct Inner {
    source: Arc<dyn StatusSource>,
    config: PollerConfig,
    state: Mutex<PollState>,
    view_tx: watch::Sender<PollerView>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(self: &Arc<Self>, st: &mut PollState, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        st.slot.rearm(delay, move |token| -> TimerTask {
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.tick(token).await;
                }
            })
        });
        tracing::debug!(delay_ms = delay.as_millis() as u64, "next status poll scheduled");
    }

    fn rearm_from_tracker(self: &Arc<Self>, st: &mut PollState) {
        let delay = st
            .tracker
            .next_delay(&self.config.cadence, &self.config.retry);
        self.arm(st, delay);
    }

    fn publish(&self, st: &PollState) {
        let view = st.tracker.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    fn log_applied(applied: Applied) {
        match applied {
            Applied::Updated { from, to } if from != to => {
                tracing::info!(%from, %to, "connection state changed");
            }
            Applied::Updated { .. } => {}
            Applied::Stale => tracing::debug!("discarded superseded status response"),
            Applied::Failed { consecutive } => {
                tracing::debug!(consecutive, "status fetch failure recorded");
            }
        }
    }

    async fn tick(self: Arc<Self>, token: ArmToken) {
        let ticket = {
            let mut st = self.lock();
            if !st.mounted || !st.slot.disarm_fired(token) {
                return;
            }
            st.tracker.begin_request()
        };
        tracing::debug!("polling status");
        let result = self.source.fetch_status().await;
        if self.settle_fetch(ticket, &result, true) {
            self.run_auto_start().await;
        }
    }

    /// Fetch outside the timer. `rearm` restarts the timer afterwards.
    async fn fetch(self: &Arc<Self>, rearm: bool) -> Result<ConnectionStatus, PollerError> {
        let ticket = {
            let mut st = self.lock();
            if !st.mounted {
                return Err(PollerError::Unmounted);
            }
            if rearm {
                st.slot.clear();
            }
            st.tracker.begin_request()
        };
        let result = self.source.fetch_status().await;
        if self.settle_fetch(ticket, &result, rearm) {
            self.run_auto_start().await;
        }
        Ok(ConnectionStatus::from_payload(result?))
    }

    /// Apply a fetch result and publish. Returns whether auto start is due.
    fn settle_fetch(
        self: &Arc<Self>,
        ticket: RequestTicket,
        result: &Result<StatusPayload, ApiError>,
        rearm: bool,
    ) -> bool {
        if let Err(e) = result {
            tracing::warn!("status fetch failed: {e}");
        }
        let mut st = self.lock();
        if !st.mounted {
            tracing::debug!("ignoring status response after unmount");
            return false;
        }
        let applied = st.tracker.apply(ticket, result.as_ref().map(Clone::clone));
        Self::log_applied(applied);
        self.publish(&st);
        if rearm {
            self.rearm_from_tracker(&mut st);
        }
        st.tracker.take_auto_start()
    }

    async fn start(self: &Arc<Self>) -> Result<ConnectionStatus, PollerError> {
        let ticket = {
            let mut st = self.lock();
            if !st.mounted {
                return Err(PollerError::Unmounted);
            }
            st.tracker.begin_start()
        };
        let payload = self.source.start_connection().await?;

        let mut st = self.lock();
        if st.mounted {
            let applied = st.tracker.apply(ticket, Ok(payload.clone()));
            Self::log_applied(applied);
            if applied != Applied::Stale {
                self.publish(&st);
                self.rearm_from_tracker(&mut st);
            }
        }
        Ok(ConnectionStatus::from_payload(payload))
    }

    async fn run_auto_start(self: &Arc<Self>) {
        tracing::info!("account not linked, starting connection");
        if let Err(e) = self.start().await {
            tracing::warn!("automatic connection start failed: {e}");
        }
    }

    fn unmount(&self) {
        let mut st = self.lock();
        if st.mounted {
            st.mounted = false;
            st.slot.clear();
            tracing::debug!("status poller unmounted");
        }
    }
}

/// Handle to a mounted poller. Dropping it unmounts.
pub struct StatusPoller {
    inner: Arc<Inner>,
}

impl StatusPoller {
    /// Mount and fetch immediately. Must be called within a tokio runtime.
    pub fn mount<S>(source: S, scheduler: Arc<dyn Scheduler>, config: PollerConfig) -> Self
    where
        S: StatusSource + 'static,
    {
        let (view_tx, _) = watch::channel(PollerView::default());
        let inner = Arc::new(Inner {
            source: Arc::new(source),
            config,
            state: Mutex::new(PollState {
                tracker: StatusTracker::new(config.auto_start),
                slot: TimerSlot::new(scheduler),
                mounted: true,
            }),
            view_tx,
        });
        {
            let mut st = inner.lock();
            inner.arm(&mut st, Duration::ZERO);
        }
        tracing::debug!(auto_start = config.auto_start, "status poller mounted");
        Self { inner }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerView> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> PollerView {
        self.inner.view_tx.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lock().mounted
    }

    /// Fetch now. Errors are returned after being recorded; the held
    /// snapshot survives a failure.
    pub async fn fetch_status(&self) -> Result<ConnectionStatus, PollerError> {
        self.inner.fetch(false).await
    }

    /// Manual refresh: fetch now and restart the poll timer from the result.
    pub async fn refresh(&self) -> Result<ConnectionStatus, PollerError> {
        self.inner.fetch(true).await
    }

    /// Begin pairing. On success the returned snapshot replaces the held one
    /// and the cadence is recomputed.
    pub async fn start_connection(&self) -> Result<ConnectionStatus, PollerError> {
        self.inner.start().await
    }

    /// Destructive reset through `admin`, then a refresh. Never automatic.
    pub async fn reset_connection<A>(&self, admin: &A) -> Result<ActionResult, PollerError>
    where
        A: ConnectionAdmin + ?Sized,
    {
        if !self.is_mounted() {
            return Err(PollerError::Unmounted);
        }
        let ack = admin.reset_connection().await?;
        tracing::info!(success = ack.success, "connection reset: {}", ack.message);
        if let Err(e) = self.refresh().await {
            tracing::warn!("refresh after reset failed: {e}");
        }
        Ok(ack)
    }

    /// Cancel the timer and stop applying results. Idempotent.
    pub fn unmount(&self) {
        self.inner.unmount();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.inner.unmount();
    }
}
