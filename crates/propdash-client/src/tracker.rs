//! Connection status tracking.
//!
//! Pure, deterministic state machine with no IO, clock or async. The async
//! [`crate::poller::StatusPoller`] feeds it results and asks it for the next
//! delay.

use std::time::Duration;

use propdash_api::ApiError;
use propdash_core::{ConnectionState, ConnectionStatus, PollCadence, StatusPayload};

// ─── Retry policy ────────────────────────────────────────────────

/// Backoff applied after failed fetches.
///
/// Delays double from `initial` and never exceed the fast cadence. After
/// `max_retries` consecutive failures the regular cadence resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failures`-th consecutive failure, if still retrying.
    pub fn delay_for(&self, failures: u32, cap: Duration) -> Option<Duration> {
        if failures == 0 || failures > self.max_retries {
            return None;
        }
        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        Some(self.initial.saturating_mul(factor).min(cap))
    }
}

// ─── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Fetch,
    StartConnection,
}

/// Issued for every outgoing request; results are applied against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    seq: u64,
    kind: RequestKind,
}

/// Outcome of [`StatusTracker::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A newer request was issued after this one; the result was dropped.
    Stale,
    /// The snapshot was replaced.
    Updated {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The request failed; the previous snapshot is kept.
    Failed { consecutive: u32 },
}

// ─── View ────────────────────────────────────────────────────────

/// What subscribers see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerView {
    pub snapshot: Option<ConnectionStatus>,
    pub state: ConnectionState,
    pub error: Option<String>,
    pub consecutive_failures: u32,
    pub auto_started: bool,
}

// ─── Tracker ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StatusTracker {
    snapshot: Option<ConnectionStatus>,
    error: Option<String>,
    consecutive_failures: u32,
    issued: u64,
    auto_start_enabled: bool,
    auto_start_decided: bool,
    auto_start_due: bool,
    auto_started: bool,
}

impl StatusTracker {
    pub fn new(auto_start: bool) -> Self {
        Self {
            snapshot: None,
            error: None,
            consecutive_failures: 0,
            issued: 0,
            auto_start_enabled: auto_start,
            auto_start_decided: false,
            auto_start_due: false,
            auto_started: false,
        }
    }

    pub fn begin_request(&mut self) -> RequestTicket {
        self.issue(RequestKind::Fetch)
    }

    pub fn begin_start(&mut self) -> RequestTicket {
        self.issue(RequestKind::StartConnection)
    }

    fn issue(&mut self, kind: RequestKind) -> RequestTicket {
        self.issued += 1;
        RequestTicket {
            seq: self.issued,
            kind,
        }
    }

    /// Apply the result of the request identified by `ticket`.
    ///
    /// Start-connection failures belong to the caller and should not be
    /// passed here; they leave the tracker untouched.
    pub fn apply(
        &mut self,
        ticket: RequestTicket,
        result: Result<StatusPayload, &ApiError>,
    ) -> Applied {
        if ticket.seq < self.issued {
            return Applied::Stale;
        }

        match result {
            Ok(payload) => {
                let from = self.state();
                let status = ConnectionStatus::from_payload(payload);

                match ticket.kind {
                    RequestKind::Fetch if !self.auto_start_decided => {
                        self.auto_start_decided = true;
                        self.auto_start_due = self.auto_start_enabled
                            && !status.is_connected
                            && !status.is_qr_pending();
                    }
                    RequestKind::StartConnection => {
                        // A manual start settles the question.
                        self.auto_start_decided = true;
                        self.auto_start_due = false;
                    }
                    RequestKind::Fetch => {}
                }

                self.snapshot = Some(status);
                self.error = None;
                self.consecutive_failures = 0;
                Applied::Updated {
                    from,
                    to: self.state(),
                }
            }
            Err(e) => {
                self.error = Some(e.user_message());
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                Applied::Failed {
                    consecutive: self.consecutive_failures,
                }
            }
        }
    }

    /// True at most once per tracker, after the first snapshot showed an
    /// unlinked account with no pairing in progress.
    pub fn take_auto_start(&mut self) -> bool {
        if self.auto_start_due {
            self.auto_start_due = false;
            self.auto_started = true;
            true
        } else {
            false
        }
    }

    pub fn next_delay(&self, cadence: &PollCadence, retry: &RetryPolicy) -> Duration {
        if self.error.is_some() {
            return retry
                .delay_for(self.consecutive_failures, cadence.fast)
                .unwrap_or(cadence.fast);
        }
        cadence.interval_for(self.snapshot.as_ref())
    }

    pub fn state(&self) -> ConnectionState {
        if self.error.is_some() {
            return ConnectionState::Error;
        }
        self.snapshot
            .as_ref()
            .map(ConnectionStatus::state)
            .unwrap_or_default()
    }

    pub fn view(&self) -> PollerView {
        PollerView {
            snapshot: self.snapshot.clone(),
            state: self.state(),
            error: self.error.clone(),
            consecutive_failures: self.consecutive_failures,
            auto_started: self.auto_started,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disconnected() -> StatusPayload {
        StatusPayload::default()
    }

    fn qr(code: &str) -> StatusPayload {
        StatusPayload {
            qr_code: Some(code.into()),
            ..StatusPayload::default()
        }
    }

    fn connected() -> StatusPayload {
        StatusPayload {
            is_connected: true,
            ..StatusPayload::default()
        }
    }

    fn fetch(t: &mut StatusTracker, payload: StatusPayload) -> Applied {
        let ticket = t.begin_request();
        t.apply(ticket, Ok(payload))
    }

    #[test]
    fn starts_idle_with_fast_cadence() {
        let t = StatusTracker::new(true);
        assert_eq!(t.state(), ConnectionState::Idle);
        assert_eq!(t.view(), PollerView::default());
        assert_eq!(
            t.next_delay(&PollCadence::default(), &RetryPolicy::default()),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn pairing_sequence_has_no_spurious_connecting() {
        let mut t = StatusTracker::new(false);
        let mut states = Vec::new();
        for p in [disconnected(), qr("ABC123"), connected()] {
            fetch(&mut t, p);
            states.push(t.state());
        }
        assert_eq!(
            states,
            vec![
                ConnectionState::Idle,
                ConnectionState::QrPending,
                ConnectionState::Connected
            ]
        );
    }

    #[test]
    fn backend_connecting_status_is_reported() {
        let mut t = StatusTracker::new(false);
        fetch(
            &mut t,
            StatusPayload {
                status: Some("connecting".into()),
                ..StatusPayload::default()
            },
        );
        assert_eq!(t.state(), ConnectionState::Connecting);
    }

    #[test]
    fn stale_result_is_discarded() {
        let mut t = StatusTracker::new(false);
        let slow = t.begin_request();
        let fast = t.begin_request();

        assert!(matches!(t.apply(fast, Ok(connected())), Applied::Updated { .. }));
        assert_eq!(t.apply(slow, Ok(disconnected())), Applied::Stale);
        assert_eq!(t.state(), ConnectionState::Connected);
    }

    #[test]
    fn failure_keeps_snapshot_and_success_clears_error() {
        let mut t = StatusTracker::new(false);
        fetch(&mut t, qr("ABC123"));

        let ticket = t.begin_request();
        let err = ApiError::Network("connection refused".into());
        assert_eq!(t.apply(ticket, Err(&err)), Applied::Failed { consecutive: 1 });

        let view = t.view();
        assert_eq!(view.state, ConnectionState::Error);
        assert_eq!(view.error.as_deref(), Some("connection refused"));
        assert_eq!(
            view.snapshot.and_then(|s| s.qr_code).as_deref(),
            Some("ABC123")
        );

        fetch(&mut t, qr("ABC123"));
        assert_eq!(t.state(), ConnectionState::QrPending);
        assert_eq!(t.view().consecutive_failures, 0);
    }

    #[test]
    fn auto_start_only_once_and_only_from_first_snapshot() {
        let mut t = StatusTracker::new(true);
        fetch(&mut t, disconnected());
        assert!(t.take_auto_start());
        assert!(!t.take_auto_start());

        fetch(&mut t, disconnected());
        fetch(&mut t, disconnected());
        assert!(!t.take_auto_start());
        assert!(t.view().auto_started);
    }

    #[test]
    fn auto_start_skipped_when_already_pairing_or_linked() {
        for first in [qr("ABC123"), connected()] {
            let mut t = StatusTracker::new(true);
            fetch(&mut t, first);
            fetch(&mut t, disconnected());
            assert!(!t.take_auto_start());
        }
    }

    #[test]
    fn auto_start_waits_for_a_successful_fetch() {
        let mut t = StatusTracker::new(true);
        let ticket = t.begin_request();
        t.apply(ticket, Err(&ApiError::Network("down".into())));
        assert!(!t.take_auto_start());

        fetch(&mut t, disconnected());
        assert!(t.take_auto_start());
    }

    #[test]
    fn auto_start_disabled() {
        let mut t = StatusTracker::new(false);
        fetch(&mut t, disconnected());
        assert!(!t.take_auto_start());
    }

    #[test]
    fn manual_start_settles_auto_start() {
        let mut t = StatusTracker::new(true);
        let ticket = t.begin_start();
        t.apply(ticket, Ok(qr("ABC123")));
        fetch(&mut t, disconnected());
        assert!(!t.take_auto_start());
    }

    #[test]
    fn cadence_follows_snapshot() {
        let cadence = PollCadence::default();
        let retry = RetryPolicy::default();
        let mut t = StatusTracker::new(false);

        fetch(&mut t, qr("ABC123"));
        assert_eq!(t.next_delay(&cadence, &retry), Duration::from_secs(5));
        fetch(&mut t, connected());
        assert_eq!(t.next_delay(&cadence, &retry), Duration::from_secs(30));
    }

    #[test]
    fn retry_backoff_then_regular_cadence() {
        let cadence = PollCadence::default();
        let retry = RetryPolicy::default();
        let mut t = StatusTracker::new(false);
        fetch(&mut t, connected());

        let err = ApiError::from_status(503, "", "");
        let mut delays = Vec::new();
        for _ in 0..5 {
            let ticket = t.begin_request();
            t.apply(ticket, Err(&err));
            delays.push(t.next_delay(&cadence, &retry));
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
                Duration::from_secs(5),
            ]
        );
    }

    #[test]
    fn retry_delay_capped() {
        let retry = RetryPolicy {
            initial: Duration::from_secs(3),
            max_retries: 3,
        };
        assert_eq!(
            retry.delay_for(3, Duration::from_secs(5)),
            Some(Duration::from_secs(5))
        );
        assert_eq!(retry.delay_for(0, Duration::from_secs(5)), None);
    }
}
