#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("serialize toml: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("parse toml: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
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
