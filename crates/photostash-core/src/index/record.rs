use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything known about one distinct content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub hash: String,
    pub size: u64,
    /// Every path holding this content, in the order first seen.
    #[serde(rename = "files")]
    pub paths: Vec<PathBuf>,
    #[serde(rename = "date", default, with = "capture_date")]
    pub captured_at: Option<NaiveDateTime>,
    /// Location in the hash tree, set once the tree links this hash.
    #[serde(rename = "hashfile", default)]
    pub canonical_link_path: Option<PathBuf>,
}

impl FileMetadata {
    pub fn new(hash: String, size: u64, first_path: PathBuf) -> Self {
        Self {
            hash,
            size,
            paths: vec![first_path],
            captured_at: None,
            canonical_link_path: None,
        }
    }

    pub fn first_path(&self) -> Option<&PathBuf> {
        self.paths.first()
    }
}

/// Formats accepted for `date`, in the order tried.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];
const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z"];

/// Lenient timestamp parsing. Zoned values keep their local wall-clock time.
pub fn parse_capture_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })
}

pub fn format_capture_date(date: &NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

mod capture_date {
    use super::{format_capture_date, parse_capture_date};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::warn;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&format_capture_date(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|raw| {
            let parsed = parse_capture_date(&raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                warn!("Ignoring unparsable capture date '{}'", raw);
            }
            parsed
        }))
    }
}
