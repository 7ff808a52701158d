//! Connection snapshot model, state derivation and poll cadence.
//!
//! A [`ConnectionStatus`] is an immutable snapshot built from one backend
//! status payload. Snapshots are replaced wholesale on every fetch.
//!
//! State derivation is a pure function of the latest snapshot:
//!
//! - connected (either flag) → `Connected`
//! - QR payload present → `QrPending`
//! - backend reports `status: "connecting"` → `Connecting`
//! - otherwise → `Idle`

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default poll interval while pairing is pending, connecting or idle.
pub const FAST_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default poll interval once the account is linked.
pub const SLOW_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Backend `status` value that marks an in-progress connection attempt.
pub const BACKEND_STATUS_CONNECTING: &str = "connecting";

// ─── Wire payload ─────────────────────────────────────────────────

/// Status payload as returned by the status and connect endpoints.
///
/// Every field is optional on the wire; older backends send `connected`
/// instead of `isConnected`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub connected: Option<bool>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "qr_pending")]
    pub qr_pending: Option<bool>,
    #[serde(default, rename = "socket_active")]
    pub socket_active: Option<bool>,
    #[serde(default, rename = "active_connections")]
    pub active_connections: Option<u32>,
    #[serde(default, rename = "total_services")]
    pub total_services: Option<u32>,
    #[serde(default, rename = "user_id")]
    pub user_id: Option<String>,
}

// ─── State ────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    QrPending,
    Connected,
    /// Latest fetch failed. Never derived from a snapshot.
    Error,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::QrPending => "qr_pending",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────

/// Point-in-time view of the remote connection status.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    /// Pairing payload to render as a scannable code. Opaque to this crate.
    pub qr_code: Option<String>,
    pub backend_status: Option<String>,
    pub message: Option<String>,
    pub socket_active: Option<bool>,
    pub active_connections: Option<u32>,
    pub user_id: Option<String>,
}

impl ConnectionStatus {
    /// Build a snapshot from a wire payload.
    ///
    /// A payload that is connected and still carries a QR code is
    /// contradictory; the connected flag wins and the QR code is dropped.
    pub fn from_payload(payload: StatusPayload) -> Self {
        let is_connected = payload.is_connected || payload.connected.unwrap_or(false);
        let qr_code = if is_connected {
            None
        } else {
            payload.qr_code.filter(|qr| !qr.is_empty())
        };

        Self {
            is_connected,
            qr_code,
            backend_status: payload.status,
            message: payload.message,
            socket_active: payload.socket_active,
            active_connections: payload.active_connections,
            user_id: payload.user_id,
        }
    }

    pub fn state(&self) -> ConnectionState {
        derive_state(self)
    }

    pub fn is_qr_pending(&self) -> bool {
        !self.is_connected && self.qr_code.is_some()
    }
}

impl From<StatusPayload> for ConnectionStatus {
    fn from(payload: StatusPayload) -> Self {
        Self::from_payload(payload)
    }
}

/// Derive the connection state from a snapshot.
pub fn derive_state(status: &ConnectionStatus) -> ConnectionState {
    if status.is_connected {
        ConnectionState::Connected
    } else if status.qr_code.is_some() {
        ConnectionState::QrPending
    } else if status.backend_status.as_deref() == Some(BACKEND_STATUS_CONNECTING) {
        ConnectionState::Connecting
    } else {
        ConnectionState::Idle
    }
}

// ─── Cadence ──────────────────────────────────────────────────────

/// Adaptive poll cadence: fast until linked, slow once linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCadence {
    pub fast: Duration,
    pub slow: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            fast: FAST_POLL_INTERVAL,
            slow: SLOW_POLL_INTERVAL,
        }
    }
}

impl PollCadence {
    /// Interval until the next poll given the latest snapshot.
    ///
    /// No snapshot yet counts as not linked.
    pub fn interval_for(&self, status: Option<&ConnectionStatus>) -> Duration {
        match status {
            Some(s) if s.is_connected && s.qr_code.is_none() => self.slow,
            _ => self.fast,
        }
    }
}
