//! propdash: command-line client for the property listing dashboard.
//! Signs in against the identity provider, links the messaging account
//! through the status poller, and queries parsed listings.

use clap::Parser;
use propdash_api::ApiError;
use propdash_client::PollerError;

mod cli;
mod cmd_auth;
mod cmd_connection;
mod cmd_groups;
mod cmd_properties;
mod context;
mod render;

fn init_tracing() {
    let filter = std::env::var("PROPDASH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

/// User-facing line for a command failure.
fn describe_error(e: &anyhow::Error) -> String {
    let api = e
        .downcast_ref::<ApiError>()
        .or_else(|| e.downcast_ref::<PollerError>().and_then(PollerError::api));
    match api {
        Some(api) => render::api_error_line(api),
        None => format!("error: {e:#}"),
    }
}

async fn run(args: cli::Cli) -> anyhow::Result<i32> {
    let ctx = context::AppContext::from_cli(&args)?;

    match args.command {
        cli::Command::Login(opts) => cmd_auth::cmd_login(&ctx, &opts).await?,
        cli::Command::Signup(opts) => cmd_auth::cmd_signup(&ctx, &opts).await?,
        cli::Command::Logout => cmd_auth::cmd_logout(&ctx).await?,
        cli::Command::Whoami => cmd_auth::cmd_whoami(&ctx).await?,
        cli::Command::Status(opts) => cmd_connection::cmd_status(&ctx, &opts).await?,
        cli::Command::Connect(opts) => {
            return cmd_connection::cmd_connect(&ctx, &opts).await;
        }
        cli::Command::Watch => cmd_connection::cmd_watch(&ctx).await?,
        cli::Command::Reset(opts) => cmd_connection::cmd_reset(&ctx, &opts).await?,
        cli::Command::Disconnect => cmd_connection::cmd_disconnect(&ctx).await?,
        cli::Command::Groups(command) => cmd_groups::cmd_groups(&ctx, &command).await?,
        cli::Command::Properties(opts) => cmd_properties::cmd_properties(&ctx, &opts).await?,
        cli::Command::Export(opts) => cmd_properties::cmd_export(&ctx, &opts).await?,
        cli::Command::Browse(opts) => cmd_properties::cmd_browse(&ctx, &opts).await?,
    }

    Ok(0)
}

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    init_tracing();

    let exit_code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}", describe_error(&e));
            1
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
