use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Index file {} is not valid: {source}", path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Remote storage error: {0}")]
    Remote(#[from] opendal::Error),

    #[error("Unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Unable to parse remote URI '{0}', only s3:// URIs are supported")]
    InvalidRemoteUri(String),

    #[error("No record for hash {0}")]
    UnknownHash(String),

    #[error("Hash {hash} is already linked at {}", existing.display())]
    AlreadyLinked { hash: String, existing: PathBuf },

    /// The caller broke an API contract. Never retried, never skipped.
    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Error::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::Contract(_))
    }

    /// Whether a remote call that failed this way may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_temporary(),
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A recoverable failure for one entry of a batch. The batch carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl EntryFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}
