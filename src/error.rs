use thiserror::Error;

/// Errors produced anywhere in the query engine.
///
/// `Cancelled` is carried here for internal plumbing convenience, but the
/// engine never routes it through `Observer::error` — it is matched out at
/// the one call site that would otherwise deliver it (see `engine.rs`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown reference: {0}")]
    UnknownReference(String),

    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("decompression failure: {0}")]
    DecompressionFailure(String),

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("traversal incomplete: {0} node offset(s) never resolved")]
    TraversalIncomplete(usize),

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::InvalidArgument(s) => Error::InvalidArgument(s.clone()),
            Error::UnknownReference(s) => Error::UnknownReference(s.clone()),
            Error::IoFailure(e) => Error::IoFailure(std::io::Error::new(e.kind(), e.to_string())),
            Error::DecompressionFailure(s) => Error::DecompressionFailure(s.clone()),
            Error::ParseFailure(s) => Error::ParseFailure(s.clone()),
            Error::TraversalIncomplete(n) => Error::TraversalIncomplete(*n),
            Error::Cancelled => Error::Cancelled,
        }
    }
}
