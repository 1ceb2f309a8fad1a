use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hex length of a content hash.
pub const HASH_HEX_LEN: usize = 64;

/// SHA-256 of a file's full content, plus the number of bytes hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    pub hash: String,
    pub size: u64,
}

pub fn content_digest(file: &Path) -> io::Result<ContentDigest> {
    let f = File::open(file)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, f);
    let mut hasher = Sha256::new();
    let size = io::copy(&mut reader, &mut hasher)?;
    Ok(ContentDigest {
        hash: hex::encode(hasher.finalize()),
        size,
    })
}

pub fn hash_data(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
