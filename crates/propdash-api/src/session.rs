//! Identity provider capability and local session persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Seconds before expiry at which a session is treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// An issued identity-provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds. `None` means the token does not expire.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Session {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            refresh_token: None,
            expires_at: None,
            user_id: None,
            email: None,
        }
    }

    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| now_secs >= exp.saturating_sub(EXPIRY_MARGIN_SECS))
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created and signed in immediately.
    SignedIn(Session),
    /// Account created; the email address must be confirmed first.
    ConfirmationRequired { email: String },
}

/// Capability interface of the identity provider.
///
/// `get_session` never fails the caller's request: an error or `None`
/// means requests go out unauthenticated.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, ApiError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ApiError>;
    async fn sign_out(&self) -> Result<(), ApiError>;
}

/// Fixed bearer token, e.g. from `PROPDASH_TOKEN`.
pub struct StaticSession {
    session: Session,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            session: Session::from_token(token),
        }
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSession {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        Ok(Some(self.session.clone()))
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, ApiError> {
        Err(ApiError::Auth(
            "a static token is configured; unset PROPDASH_TOKEN to sign in".into(),
        ))
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignUpOutcome, ApiError> {
        Err(ApiError::Auth(
            "a static token is configured; unset PROPDASH_TOKEN to sign up".into(),
        ))
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// No identity provider configured. Every request is anonymous.
pub struct NoSession;

#[async_trait::async_trait]
impl SessionProvider for NoSession {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        Ok(None)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, ApiError> {
        Err(ApiError::Auth("no identity provider configured".into()))
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignUpOutcome, ApiError> {
        Err(ApiError::Auth("no identity provider configured".into()))
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

// ─── Session store ────────────────────────────────────────────────

/// JSON file holding the current session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session. A missing file is `None`; a corrupt file
    /// is treated the same way and logged.
    pub fn load(&self) -> Result<Option<Session>, ApiError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("ignoring unreadable session file {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), ApiError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten a file left by an older
        // run before any token bytes land in it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Default per-user session file location.
pub fn default_session_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir).join("propdash/session.json");
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config/propdash/session.json")
}
