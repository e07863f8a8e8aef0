use ragkit_service_traits::ServiceError;

use crate::tree_stats::TreeInvariantError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Config(#[from] ragkit_config::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid folder tree: {0}")]
    InvalidTree(#[from] TreeInvariantError),
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
