//! propdash-client: the stateful half of the dashboard.
//!
//! - [`poller`]: connection status polling with adaptive cadence and QR
//!   auto start
//! - [`status_cache`]: one shared poller per status resource
//! - [`debounce`]: trailing-edge filter debouncing
//!
//! Timers go through [`scheduler::Scheduler`]; the pure decisions live in
//! [`tracker`].

pub mod debounce;
pub mod error;
pub mod poller;
pub mod scheduler;
pub mod status_cache;
pub mod tracker;

pub use debounce::{DEFAULT_QUIET_PERIOD, FilterDebouncer};
pub use error::{CacheError, PollerError};
pub use poller::{PollerConfig, StatusPoller};
pub use scheduler::{Scheduler, TimerSlot, TokioScheduler};
pub use status_cache::{MY_STATUS, PUBLIC_STATUS, StatusCache, StatusSubscription};
pub use tracker::{PollerView, RetryPolicy, StatusTracker};
