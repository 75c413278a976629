//! Error taxonomy for the oracle.
//!
//! The four variants map to the four failure classes the consuming tooling
//! branches on: bad configuration and bad corpus data are fatal before any
//! request is served, malformed request records are reported per-request,
//! and commit failures guarantee the compact file was left untouched.

use std::path::PathBuf;

/// Error types for oracle operations
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("bad case data in {}: {reason}", file.display())]
    Data { file: PathBuf, reason: String },

    #[error("malformed request record: {0}")]
    RequestFormat(String),

    #[error("commit i/o failure on {}: {source}", file.display())]
    CommitIo {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OracleError {
    pub fn config(message: impl Into<String>) -> Self {
        OracleError::Config(message.into())
    }

    pub fn data(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        OracleError::Data {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for fatal errors (0 is reserved for clean shutdown).
    pub fn exit_code(&self) -> u8 {
        match self {
            OracleError::Config(_) => 2,
            OracleError::Data { .. } => 3,
            OracleError::RequestFormat(_) => 1,
            OracleError::CommitIo { .. } => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
