//! Trailing-edge debouncer for filter edits.
//!
//! Edits are visible through [`FilterDebouncer::criteria`] immediately; the
//! commit callback sees them only after the quiet period passes without
//! another edit. `clear` commits the defaults synchronously.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use propdash_core::filter::parse_pair;
use propdash_core::{CoreError, FilterCriteria, FilterField, FilterValue};

use crate::scheduler::{ArmToken, Scheduler, TimerSlot, TimerTask};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

type CommitFn = dyn Fn(FilterCriteria) + Send + Sync;

struct DebounceState {
    criteria: FilterCriteria,
    slot: TimerSlot,
    pending: bool,
    mounted: bool,
}

struct Inner {
    quiet: Duration,
    on_commit: Box<CommitFn>,
    /// Held for the whole of a commit, and by `unmount`. Once `unmount`
    /// returns, no callback is running or will run.
    commit_gate: Mutex<()>,
    state: Mutex<DebounceState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.commit_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, token: ArmToken) {
        let _gate = self.gate();
        let committed = {
            let mut st = self.lock();
            if !st.mounted || !st.slot.disarm_fired(token) {
                return;
            }
            st.pending = false;
            st.criteria.clone()
        };
        tracing::debug!(active = committed.active_count(), "filter commit");
        (self.on_commit)(committed);
    }
}

pub struct FilterDebouncer {
    inner: Arc<Inner>,
}

impl FilterDebouncer {
    /// `on_commit` runs with the commit gate held and must not call back
    /// into this debouncer.
    pub fn mount<F>(scheduler: Arc<dyn Scheduler>, quiet: Duration, on_commit: F) -> Self
    where
        F: Fn(FilterCriteria) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                quiet,
                on_commit: Box::new(on_commit),
                commit_gate: Mutex::new(()),
                state: Mutex::new(DebounceState {
                    criteria: FilterCriteria::default(),
                    slot: TimerSlot::new(scheduler),
                    pending: false,
                    mounted: true,
                }),
            }),
        }
    }

    /// Update one field and restart the quiet period.
    ///
    /// Returns `Ok(false)` when the value is already current (nothing is
    /// rescheduled) or the debouncer is unmounted.
    pub fn set_field(&self, field: FilterField, value: FilterValue) -> Result<bool, CoreError> {
        let mut st = self.inner.lock();
        if !st.mounted {
            return Ok(false);
        }
        let next = st.criteria.with(field, value)?;
        if next == st.criteria {
            return Ok(false);
        }
        st.criteria = next;
        st.pending = true;

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        st.slot.rearm(self.inner.quiet, move |token| -> TimerTask {
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(token);
                }
            })
        });
        Ok(true)
    }

    /// Apply a raw `key=value` pair through [`Self::set_field`].
    pub fn apply_pair(&self, pair: &str) -> Result<bool, CoreError> {
        let (field, value) = parse_pair(pair)?;
        self.set_field(field, value)
    }

    /// Reset to defaults and commit them now, dropping any pending commit.
    pub fn clear(&self) {
        let _gate = self.inner.gate();
        let defaults = {
            let mut st = self.inner.lock();
            if !st.mounted {
                return;
            }
            st.slot.clear();
            st.pending = false;
            st.criteria = FilterCriteria::default();
            st.criteria.clone()
        };
        (self.inner.on_commit)(defaults);
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.inner.lock().criteria.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending
    }

    /// Drop any pending commit. The callback never runs afterwards.
    ///
    /// Waits for a commit already in progress on another thread.
    pub fn unmount(&self) {
        let _gate = self.inner.gate();
        let mut st = self.inner.lock();
        st.mounted = false;
        st.pending = false;
        st.slot.clear();
    }
}

impl Drop for FilterDebouncer {
    fn drop(&mut self) {
        self.unmount();
    }
}
