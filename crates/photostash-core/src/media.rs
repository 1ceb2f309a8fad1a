//! File-embedded metadata: capture timestamps and image sniffing.

use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Tag, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::trace;

/// Preferred order when a file carries more than one date.
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTime, Tag::DateTimeDigitized];

const SNIFF_LENGTH: u64 = 64;

/// ISO-BMFF `ftyp` major brands of still-image containers (HEIF, HEIC, AVIF).
const IMAGE_BRANDS: [&[u8]; 8] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heif", b"mif1", b"msf1", b"avif",
];

/// Source of capture timestamps. Failures are reported as `None`.
pub trait CaptureTime: Send + Sync {
    fn captured_at(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Reads the capture date from EXIF metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifCaptureTime;

impl CaptureTime for ExifCaptureTime {
    fn captured_at(&self, path: &Path) -> Option<NaiveDateTime> {
        let file = File::open(path).ok()?;
        let exif = match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => exif,
            Err(e) => {
                trace!("No exif data in {}: {}", path.display(), e);
                return None;
            }
        };

        DATE_TAGS.iter().find_map(|tag| {
            let field = exif.get_field(*tag, In::PRIMARY)?;
            match &field.value {
                Value::Ascii(values) => values.first().and_then(|raw| parse_exif_datetime(raw)),
                _ => None,
            }
        })
    }
}

/// Never finds a timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCaptureTime;

impl CaptureTime for NoCaptureTime {
    fn captured_at(&self, _path: &Path) -> Option<NaiveDateTime> {
        None
    }
}

fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(
            u32::from(dt.hour),
            u32::from(dt.minute),
            u32::from(dt.second),
        )
}

/// Sniffs the leading bytes of a file for a known image signature.
/// Unreadable files are not images.
pub fn is_image(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(SNIFF_LENGTH as usize);
    if file.take(SNIFF_LENGTH).read_to_end(&mut head).is_err() {
        return false;
    }
    image::guess_format(&head).is_ok() || is_image_container(&head)
}

/// `image` has no HEIF signature, so check the `ftyp` box brand directly.
fn is_image_container(head: &[u8]) -> bool {
    head.get(4..8) == Some(&b"ftyp"[..])
        && head
            .get(8..12)
            .map_or(false, |brand| IMAGE_BRANDS.contains(&brand))
}
