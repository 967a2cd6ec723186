use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("character index {index} is outside the page's {total} characters")]
    InvalidIndex { index: usize, total: usize },

    #[error("text layout returned an unusable box for character {index}")]
    MalformedGeometry { index: usize },

    #[error("failed to acquire page {page} from the document backend")]
    ResourceAcquisition {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}
