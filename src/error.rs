/// Errors raised by the vector engine.
///
/// Cache misses are never errors, and an untrained classifier answers
/// `None` instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Mutation of something that is read-only, such as a document
    /// that is attached to a corpus.
    #[error("read-only: {0}")]
    ReadOnly(&'static str),

    /// Input that is none of the accepted shapes, or persisted text that
    /// cannot be parsed.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// LSA requested with more dimensions than the corpus can support.
    #[error("can't create {requested} dimensions from {documents} documents")]
    Dimension { requested: usize, documents: usize },

    #[error("unknown document: {0}")]
    UnknownDocument(String),

    #[error("external solver failed: {0}")]
    Solver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_cbor::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedInput { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
