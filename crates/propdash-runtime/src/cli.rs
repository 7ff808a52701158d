//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use propdash_core::{CoreError, FilterCriteria, FilterField, FilterValue, ListingType};

#[derive(Parser)]
#[command(name = "propdash", version, about = "Property listing dashboard client")]
pub struct Cli {
    /// Backend base URL
    #[arg(
        long,
        env = "PROPDASH_API_URL",
        default_value = "http://localhost:3000",
        global = true
    )]
    pub api_url: String,

    /// Identity provider (GoTrue) project URL
    #[arg(long, env = "PROPDASH_AUTH_URL", global = true)]
    pub auth_url: Option<String>,

    /// Identity provider publishable key
    #[arg(long, env = "PROPDASH_ANON_KEY", global = true, hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Fixed bearer token; bypasses the identity provider
    #[arg(long, env = "PROPDASH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Session file (default: $XDG_CONFIG_HOME/propdash/session.json)
    #[arg(long, env = "PROPDASH_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long = "http-timeout-secs", default_value = "30", global = true)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login(CredentialOpts),
    /// Create an account
    Signup(CredentialOpts),
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// One-shot connection status
    Status(StatusOpts),
    /// Link the messaging account, showing QR codes until connected
    Connect(ConnectOpts),
    /// Live connection status until Ctrl-C
    Watch,
    /// Force logout of the linked account (destructive)
    Reset(ResetOpts),
    /// Disconnect the linked account
    Disconnect,
    /// Monitored group management
    #[command(subcommand)]
    Groups(GroupsCommand),
    /// Query parsed property listings
    Properties(PropertiesOpts),
    /// Export matching listings as CSV
    Export(ExportOpts),
    /// Interactive filter session: `key=value` lines, `clear`, `quit`
    Browse(BrowseOpts),
}

#[derive(clap::Args)]
pub struct CredentialOpts {
    #[arg(long)]
    pub email: String,

    /// Read from PROPDASH_PASSWORD or prompted on stdin when omitted
    #[arg(long, env = "PROPDASH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(clap::Args, Default)]
pub struct StatusOpts {
    /// Unauthenticated service status
    #[arg(long)]
    pub public: bool,

    /// Print the raw snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args)]
pub struct ConnectOpts {
    /// Give up after this many seconds
    #[arg(long, default_value = "300")]
    pub timeout_secs: u64,
}

#[derive(clap::Args)]
pub struct ResetOpts {
    /// Confirm the destructive reset
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum GroupsCommand {
    /// List groups and their monitoring state
    List,
    /// Monitor exactly the given groups
    Save {
        /// Group ids to enable; all others are disabled
        #[arg(long = "enable", num_args = 1..)]
        enable: Vec<String>,
    },
}

#[derive(clap::Args, Default, Clone)]
pub struct FilterArgs {
    /// sale, rental or lease
    #[arg(long = "type")]
    pub listing_type: Option<ListingType>,

    #[arg(long)]
    pub property_type: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub min_price: Option<u64>,

    #[arg(long)]
    pub max_price: Option<u64>,

    #[arg(long)]
    pub bedrooms: Option<u64>,

    #[arg(long = "min-parking")]
    pub min_parking_count: Option<u64>,

    /// Minimum parsing confidence, 0.0 to 1.0
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Maximum number of rows (default 50)
    #[arg(long)]
    pub limit: Option<u64>,
}

impl FilterArgs {
    pub fn to_criteria(&self) -> Result<FilterCriteria, CoreError> {
        let mut c = FilterCriteria::default();
        if let Some(t) = self.listing_type {
            c.set(FilterField::ListingType, FilterValue::Listing(t))?;
        }
        if let Some(ref s) = self.property_type {
            c.set(FilterField::PropertyType, FilterValue::Text(s.clone()))?;
        }
        if let Some(ref s) = self.location {
            c.set(FilterField::Location, FilterValue::Text(s.clone()))?;
        }
        let ints = [
            (FilterField::MinPrice, self.min_price),
            (FilterField::MaxPrice, self.max_price),
            (FilterField::Bedrooms, self.bedrooms),
            (FilterField::MinParkingCount, self.min_parking_count),
            (FilterField::Limit, self.limit),
        ];
        for (field, value) in ints {
            if let Some(n) = value {
                c.set(field, FilterValue::Int(n))?;
            }
        }
        if let Some(v) = self.min_confidence {
            c.set(FilterField::MinConfidence, FilterValue::Fraction(v))?;
        }
        Ok(c)
    }
}

#[derive(clap::Args)]
pub struct PropertiesOpts {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args)]
pub struct ExportOpts {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output file (default: property-listings-YYYY-MM-DD.csv)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct BrowseOpts {
    /// Quiet period before a filter edit is committed, in milliseconds
    #[arg(long, default_value = "300")]
    pub debounce_ms: u64,
}
