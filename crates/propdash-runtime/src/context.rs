//! Wiring shared by every command: session provider and backend client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use propdash_api::session::default_session_path;
use propdash_api::{
    BackendClient, BackendConfig, GoTrueAuth, GoTrueConfig, NoSession, SessionProvider,
    SessionStore, StaticSession,
};

use crate::cli::Cli;

/// Which identity provider the global options select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Static(String),
    GoTrue {
        url: String,
        anon_key: String,
        session_file: PathBuf,
    },
    Anonymous,
}

/// Explicit token wins, then a configured identity provider, else anonymous.
pub fn resolve_session_mode(cli: &Cli) -> SessionMode {
    if let Some(token) = cli.token.as_deref().filter(|t| !t.is_empty()) {
        return SessionMode::Static(token.to_string());
    }
    match (cli.auth_url.as_deref(), cli.anon_key.as_deref()) {
        (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => SessionMode::GoTrue {
            url: url.to_string(),
            anon_key: key.to_string(),
            session_file: cli.session_file.clone().unwrap_or_else(default_session_path),
        },
        _ => SessionMode::Anonymous,
    }
}

pub struct AppContext {
    pub sessions: Arc<dyn SessionProvider>,
    pub client: BackendClient,
    pub mode: SessionMode,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(cli.timeout_secs);
        let mode = resolve_session_mode(cli);
        let sessions: Arc<dyn SessionProvider> = match &mode {
            SessionMode::Static(token) => Arc::new(StaticSession::new(token.clone())),
            SessionMode::GoTrue {
                url,
                anon_key,
                session_file,
            } => Arc::new(
                GoTrueAuth::new(
                    GoTrueConfig {
                        url: url.clone(),
                        anon_key: anon_key.clone(),
                        timeout,
                    },
                    SessionStore::new(session_file.clone()),
                )
                .context("failed to set up identity provider")?,
            ),
            SessionMode::Anonymous => Arc::new(NoSession),
        };

        let client = BackendClient::new(
            BackendConfig {
                base_url: cli.api_url.clone(),
                timeout,
            },
            Arc::clone(&sessions),
        )
        .context("failed to set up backend client")?;
        tracing::debug!(mode = mode_label(&mode), api_url = client.base_url(), "context ready");

        Ok(Self {
            sessions,
            client,
            mode,
        })
    }
}

fn mode_label(mode: &SessionMode) -> &'static str {
    match mode {
        SessionMode::Static(_) => "static-token",
        SessionMode::GoTrue { .. } => "gotrue",
        SessionMode::Anonymous => "anonymous",
    }
}
