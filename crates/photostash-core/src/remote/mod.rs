//! Mirroring a local tree to object storage.

mod s3;
mod sync;

pub use s3::S3Store;
pub use sync::{remote_key, sync_directory, SyncOutcome};

use std::fmt;
use url::Url;

use crate::error::{Error, Result};

pub const SUPPORTED_SCHEME: &str = "s3";

/// A remote object store bound to one bucket.
pub trait ObjectStore: Send + Sync {
    /// Every key that starts with `prefix`.
    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Parsed `s3://bucket/path/prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub bucket: String,
    /// Key prefix without leading or trailing slashes. May be empty.
    pub prefix: String,
}

impl RemoteTarget {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = || Error::InvalidRemoteUri(uri.to_string());
        let url = Url::parse(uri).map_err(|_| invalid())?;
        if url.scheme() != SUPPORTED_SCHEME {
            return Err(invalid());
        }
        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(invalid)?
            .to_string();
        // `Url` keeps the path percent-encoded; keys use the name as typed.
        let prefix = urlencoding::decode(url.path())
            .map_err(|_| invalid())?
            .trim_matches('/')
            .to_string();
        Ok(Self { bucket, prefix })
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", SUPPORTED_SCHEME, self.bucket, self.prefix)
    }
}
