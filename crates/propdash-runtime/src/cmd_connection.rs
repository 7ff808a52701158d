//! Connection commands: `status`, `connect`, `watch`, `reset`, `disconnect`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use propdash_api::{ConnectionAdmin, PublicStatusSource};
use propdash_client::{
    MY_STATUS, PUBLIC_STATUS, PollerConfig, PollerView, StatusCache, StatusPoller, TokioScheduler,
};
use propdash_core::{ConnectionState, ConnectionStatus};

use crate::cli::{ConnectOpts, ResetOpts, StatusOpts};
use crate::context::{AppContext, SessionMode};
use crate::render;

pub async fn cmd_status(ctx: &AppContext, opts: &StatusOpts) -> anyhow::Result<()> {
    let payload = if opts.public {
        ctx.client.public_status().await?
    } else {
        ctx.client.my_status().await?
    };
    let status = ConnectionStatus::from_payload(payload);
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&render::status_json(&status))?);
    } else {
        println!("{}", render::format_status(&status));
    }
    Ok(())
}

// ─── connect ─────────────────────────────────────────────────────

/// Tracks what `connect` has already printed.
#[derive(Debug, Default)]
pub(crate) struct ConnectProgress {
    state: Option<ConnectionState>,
    qr: Option<String>,
    hinted_reset: bool,
}

impl ConnectProgress {
    /// Lines to print for a newly published view.
    pub(crate) fn observe(&mut self, view: &PollerView) -> Vec<String> {
        let mut lines = Vec::new();
        if self.state != Some(view.state) {
            self.state = Some(view.state);
            match (&view.error, view.state) {
                (Some(err), ConnectionState::Error) => lines.push(format!("error: {err}")),
                (_, state) => lines.push(format!("status: {}", render::state_label(state))),
            }
        }

        let qr = view.snapshot.as_ref().and_then(|s| s.qr_code.clone());
        if qr.is_some() && qr != self.qr {
            if let Some(ref code) = qr {
                lines.push(format!(
                    "scan this pairing code with the mobile app:\n{code}"
                ));
            }
        }
        self.qr = qr;

        if view.consecutive_failures >= 3 && !self.hinted_reset {
            self.hinted_reset = true;
            lines.push(
                "the backend keeps failing; if this persists run `propdash reset --yes`".into(),
            );
        }
        lines
    }
}

/// Exit codes: 0 connected, 1 timeout, 3 interrupted.
pub async fn cmd_connect(ctx: &AppContext, opts: &ConnectOpts) -> anyhow::Result<i32> {
    let poller = StatusPoller::mount(
        ctx.client.clone(),
        Arc::new(TokioScheduler::new()),
        PollerConfig::default(),
    );
    let mut rx = poller.subscribe();
    let mut progress = ConnectProgress::default();

    let deadline = tokio::time::sleep(Duration::from_secs(opts.timeout_secs));
    tokio::pin!(deadline);

    loop {
        let view = rx.borrow_and_update().clone();
        for line in progress.observe(&view) {
            println!("{line}");
        }
        if view.state == ConnectionState::Connected {
            return Ok(0);
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    bail!("status poller stopped unexpectedly");
                }
            }
            _ = &mut deadline => {
                eprintln!("timed out after {}s waiting for the account to link", opts.timeout_secs);
                return Ok(1);
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(3);
            }
        }
    }
}

// ─── watch ───────────────────────────────────────────────────────

pub async fn cmd_watch(ctx: &AppContext) -> anyhow::Result<()> {
    let watch_config = PollerConfig {
        auto_start: false,
        ..PollerConfig::default()
    };
    let mut cache = StatusCache::new(Arc::new(TokioScheduler::new()));
    cache.register(MY_STATUS, ctx.client.clone(), watch_config);
    cache.register(
        PUBLIC_STATUS,
        PublicStatusSource::new(ctx.client.clone()),
        watch_config,
    );

    let key = match ctx.mode {
        SessionMode::Anonymous => PUBLIC_STATUS,
        _ => MY_STATUS,
    };
    let mut sub = cache.subscribe(key)?;
    eprintln!("watching {}; Ctrl-C to quit", sub.key());

    loop {
        tokio::select! {
            view = sub.changed() => match view {
                Some(view) => println!("{}", render::format_view_line(&view)),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

// ─── reset / disconnect ──────────────────────────────────────────

pub async fn cmd_reset(ctx: &AppContext, opts: &ResetOpts) -> anyhow::Result<()> {
    if !opts.yes {
        bail!("reset logs the linked account out on the server; re-run with --yes to confirm");
    }
    let ack = ctx.client.reset_connection().await?;
    if !ack.success {
        bail!("reset rejected: {}", ack.message);
    }
    println!("{}", non_empty_or(&ack.message, "connection reset"));
    Ok(())
}

pub async fn cmd_disconnect(ctx: &AppContext) -> anyhow::Result<()> {
    let ack = ctx.client.disconnect().await?;
    if !ack.success {
        bail!("disconnect rejected: {}", ack.message);
    }
    println!("{}", non_empty_or(&ack.message, "disconnected"));
    Ok(())
}

fn non_empty_or<'a>(msg: &'a str, fallback: &'a str) -> &'a str {
    if msg.trim().is_empty() { fallback } else { msg }
}
