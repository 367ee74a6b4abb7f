//! Error types for Coffer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CofferError {
    #[error("Size limit exceeded: {0}")]
    SizeLimitExceeded(String),

    #[error("Feature disallowed: {0}")]
    FeatureDisallowed(String),
}

pub type Result<T> = std::result::Result<T, CofferError>;
