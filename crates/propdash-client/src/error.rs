use propdash_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("status poller is unmounted")]
    Unmounted,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PollerError {
    /// The underlying API error, if any.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::Unmounted => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("unknown status resource: {0}")]
    UnknownResource(String),

    #[error(transparent)]
    Poller(#[from] PollerError),
}
