//! `propdash login|signup|logout|whoami`.

use std::io::{BufRead, Write};

use anyhow::{Context as _, bail};
use propdash_api::{Session, SignUpOutcome};

use crate::cli::CredentialOpts;
use crate::context::{AppContext, SessionMode};

fn require_identity_provider(ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.mode {
        SessionMode::GoTrue { .. } => Ok(()),
        SessionMode::Static(_) => bail!("a fixed token is configured (PROPDASH_TOKEN); unset it to sign in"),
        SessionMode::Anonymous => bail!(
            "no identity provider configured; set PROPDASH_AUTH_URL and PROPDASH_ANON_KEY"
        ),
    }
}

fn password(opts: &CredentialOpts) -> anyhow::Result<String> {
    if let Some(ref p) = opts.password {
        return Ok(p.clone());
    }
    eprint!("Password: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        bail!("password must not be empty");
    }
    Ok(line)
}

fn describe(session: &Session) -> String {
    match (&session.email, &session.user_id) {
        (Some(email), Some(id)) => format!("{email} ({id})"),
        (Some(email), None) => email.clone(),
        (None, Some(id)) => id.clone(),
        (None, None) => "token holder".to_string(),
    }
}

pub async fn cmd_login(ctx: &AppContext, opts: &CredentialOpts) -> anyhow::Result<()> {
    require_identity_provider(ctx)?;
    let password = password(opts)?;
    let session = ctx.sessions.sign_in(&opts.email, &password).await?;
    println!("signed in as {}", describe(&session));
    Ok(())
}

pub async fn cmd_signup(ctx: &AppContext, opts: &CredentialOpts) -> anyhow::Result<()> {
    require_identity_provider(ctx)?;
    let password = password(opts)?;
    match ctx.sessions.sign_up(&opts.email, &password).await? {
        SignUpOutcome::SignedIn(session) => {
            println!("account created; signed in as {}", describe(&session));
        }
        SignUpOutcome::ConfirmationRequired { email } => {
            println!("account created; check {email} for a confirmation link, then run `propdash login`");
        }
    }
    Ok(())
}

pub async fn cmd_logout(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.sessions.sign_out().await?;
    println!("signed out");
    Ok(())
}

pub async fn cmd_whoami(ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.sessions.get_session().await? {
        Some(session) => println!("{}", describe(&session)),
        None => println!("not signed in"),
    }
    Ok(())
}
