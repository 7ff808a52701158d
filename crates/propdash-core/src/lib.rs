//! propdash-core: pure data model for the listing dashboard client.
//! Wire payloads, connection snapshots and state derivation, poll cadence,
//! filter criteria, property and group records. No IO, no async.

pub mod connection;
pub mod filter;
pub mod groups;
pub mod types;

pub use connection::{ConnectionState, ConnectionStatus, PollCadence, StatusPayload};
pub use filter::{FilterCriteria, FilterField, FilterValue};
pub use groups::GroupSelection;
pub use types::{CoreError, ListingType, Property, PropertyResponse, PropertyStats};
