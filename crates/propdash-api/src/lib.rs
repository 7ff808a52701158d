//! propdash-api: HTTP boundary for the listing backend and its identity provider.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod gotrue;
pub mod session;
pub mod source;

pub use client::{BackendClient, BackendConfig};
pub use error::ApiError;
pub use gotrue::{GoTrueAuth, GoTrueConfig};
pub use session::{
    NoSession, Session, SessionProvider, SessionStore, SignUpOutcome, StaticSession,
};
pub use source::{ConnectionAdmin, PublicStatusSource, StatusSource};
