//! Error types for ccat

use std::io;
use thiserror::Error;

/// Boxed cause carried by backend-facing error variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for ccat operations
pub type Result<T> = std::result::Result<T, CcatError>;

/// Error types that can occur while resolving and streaming objects
#[derive(Debug, Error)]
pub enum CcatError {
    /// Input looked like a supported location but could not be split into bucket and key
    #[error("could not parse location: {0}")]
    MalformedLocation(String),

    /// Input matched none of the supported location grammars
    #[error("unrecognized location scheme: {0}")]
    UnrecognizedScheme(String),

    /// A positional argument failed to parse; wraps the parser error with the raw input
    #[error("could not parse {input} into bucket and key: {source}")]
    InvalidLocation {
        input: String,
        #[source]
        source: Box<CcatError>,
    },

    /// Region discovery reports that the bucket does not exist
    #[error("unable to find bucket {0}'s region")]
    BucketNotFound(String),

    /// Any other region discovery failure (auth, transport)
    #[error("failed to resolve region for bucket {bucket}: {source}")]
    Resolve {
        bucket: String,
        #[source]
        source: BoxError,
    },

    /// A listing page fetch failed
    #[error("failed to list s3://{bucket}/{prefix}: {source}")]
    Enumeration {
        bucket: String,
        prefix: String,
        #[source]
        source: BoxError,
    },

    /// An object download failed before or during the transfer
    #[error("failed to stream s3://{bucket}/{key}: {source}")]
    Transfer {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    /// No usable credentials were found
    #[error("could not find any valid credentials: {0}")]
    Credentials(String),

    /// The run was interrupted through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error writing to the output sink
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CcatError {
    /// Wrap a backend failure as a transfer error for `bucket`/`key`.
    pub fn transfer(
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        CcatError::Transfer {
            bucket: bucket.into(),
            key: key.into(),
            source: source.into(),
        }
    }

    /// Wrap a backend failure as an enumeration error for `bucket`/`prefix`.
    pub fn enumeration(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        CcatError::Enumeration {
            bucket: bucket.into(),
            prefix: prefix.into(),
            source: source.into(),
        }
    }

    /// Wrap a backend failure as a region resolution error for `bucket`.
    pub fn resolve(bucket: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CcatError::Resolve {
            bucket: bucket.into(),
            source: source.into(),
        }
    }
}
