use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{regions} regions configured but {codes} category/region codes")]
    MismatchedRegionCodes { regions: usize, codes: usize },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to parse selector {selector}: {message}")]
    Selector { selector: String, message: String },

    /// The three node lists of a result page did not line up.
    #[error("Listing shape mismatch: {titles} titles, {prices} prices, {distances} distances")]
    ShapeMismatch {
        titles: usize,
        prices: usize,
        distances: usize,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access to object denied: {0}")]
    Forbidden(String),

    /// A conditional write found a different revision than expected.
    #[error("Object {0} was modified concurrently")]
    ConcurrentModification(String),

    #[error("Storage I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Not-found and forbidden both mean "no ledger yet".
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::Forbidden(_))
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Ledger CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ledger serialization error: {0}")]
    Encode(String),
}

impl LedgerError {
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, LedgerError::Store(StoreError::ConcurrentModification(_)))
    }
}

/// Structured failure returned by a mail backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Mail dispatch failed ({code}): {message}")]
pub struct MailError {
    pub code: String,
    pub message: String,
}

impl MailError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
