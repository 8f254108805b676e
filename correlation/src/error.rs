use thiserror::Error;

/// Failures talking to the submission registry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("encode: {0}")]
    Encode(#[from] std::io::Error),

    /// A cofactor refers to a submission the registry did not list.
    #[error("unknown submission id: {0}")]
    UnknownSubmission(String),

    /// Only a single portfolio series can be checked.
    #[error("per-asset relative returns cannot be checked for correlation")]
    PerAsset,
}

pub type Result<T> = std::result::Result<T, Error>;
