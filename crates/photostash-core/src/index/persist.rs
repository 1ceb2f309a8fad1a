use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ContentIndex, FileMetadata};
use crate::error::{Error, Result};
use crate::media::CaptureTime;

impl ContentIndex {
    /// Reads a persisted index. A missing file yields an empty index.
    pub fn load(path: &Path, capture_time: Arc<dyn CaptureTime>) -> Result<Self> {
        let index = ContentIndex::with_capture_time(capture_time);

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No index at {}, starting empty", path.display());
                return Ok(index);
            }
            Err(e) => return Err(Error::read(path, e)),
        };

        let stored: BTreeMap<String, FileMetadata> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Index {
                path: path.to_path_buf(),
                source,
            })?;

        let mut dropped_paths = 0usize;
        for (key, mut record) in stored {
            if record.hash != key {
                warn!("Index entry {} names hash '{}', using the key", key, record.hash);
                record.hash = key;
            }
            if record.paths.is_empty() {
                warn!("Dropping index entry {} with no paths", record.hash);
                continue;
            }
            dropped_paths += index.insert_record(record);
        }
        if dropped_paths > 0 {
            warn!("{} paths were listed under more than one hash", dropped_paths);
        }

        debug!(
            "Loaded {} hashes, {} paths from {}",
            index.len(),
            index.path_count(),
            path.display()
        );
        Ok(index)
    }

    /// Writes the whole index, replacing any previous file atomically.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let snapshot: BTreeMap<String, FileMetadata> = self
            .records()
            .into_iter()
            .map(|record| (record.hash.clone(), record))
            .collect();

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = Path::new(&temp_name);

        let mut writer = BufWriter::new(File::create(temp_path)?);
        serde_json::to_writer(&mut writer, &snapshot).map_err(|source| Error::Index {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush()?;
        drop(writer);

        fs::rename(temp_path, path)?;
        info!("Wrote {} hashes to {}", snapshot.len(), path.display());
        Ok(())
    }
}
