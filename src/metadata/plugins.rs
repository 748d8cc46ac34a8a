//! Metadata plugins - extra path-scope keys read from file contents
//!
//! Each plugin maps a file path to a flat-ish key/value mapping stored under the
//! plugin's name in path scope (`path.stat.size`, `path.filetype.mime`). A file
//! that cannot be read yields an empty mapping instead of an error.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use exif::{In, Tag};
use image::ImageFormat;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Names accepted by `plugin_by_name`, in a sensible execution order
pub const PLUGIN_NAMES: [&str; 5] = ["stat", "filetype", "image", "exif", "checksum"];

/// A named source of file metadata
pub trait MetadataPlugin: Send + Sync {
    /// Name used on the command line, as filter checkpoint, and as path-scope key
    fn name(&self) -> &'static str;

    /// Gather metadata for `path`. Failures degrade to an empty mapping.
    fn run(&self, path: &Path) -> Map<String, Value>;
}

/// Look up a plugin by its name
#[must_use]
pub fn plugin_by_name(name: &str) -> Option<Box<dyn MetadataPlugin>> {
    match name {
        "stat" => Some(Box::new(StatPlugin)),
        "filetype" => Some(Box::new(FileTypePlugin)),
        "image" => Some(Box::new(ImagePlugin)),
        "exif" => Some(Box::new(ExifPlugin)),
        "checksum" => Some(Box::new(ChecksumPlugin)),
        _ => None,
    }
}

/// File system metadata: size, ownership, and timestamps
pub struct StatPlugin;

impl MetadataPlugin for StatPlugin {
    fn name(&self) -> &'static str {
        "stat"
    }

    fn run(&self, path: &Path) -> Map<String, Value> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "stat failed");
                return Map::new();
            }
        };

        let mut map = Map::new();
        map.insert("size".into(), json!(metadata.len()));
        map.insert("mode".into(), json!(metadata.mode()));
        map.insert("uid".into(), json!(metadata.uid()));
        map.insert("gid".into(), json!(metadata.gid()));
        map.insert("nlink".into(), json!(metadata.nlink()));
        map.insert("inode".into(), json!(metadata.ino()));
        for (key, secs) in [
            ("atime", metadata.atime()),
            ("mtime", metadata.mtime()),
            ("ctime", metadata.ctime()),
        ] {
            if let Some(value) = timestamp_value(secs) {
                map.insert(key.into(), value);
            }
        }
        map
    }
}

fn timestamp_value(secs: i64) -> Option<Value> {
    let local = DateTime::from_timestamp(secs, 0)?.with_timezone(&Local);
    Some(json!({
        "iso": local.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "year": local.year(),
        "month": local.month(),
        "day": local.day(),
        "timestamp": secs,
    }))
}

/// Content sniffing from the file header
pub struct FileTypePlugin;

impl FileTypePlugin {
    fn describe(format: ImageFormat) -> Option<(&'static str, &'static str)> {
        let pair = match format {
            ImageFormat::Png => ("png", "image/png"),
            ImageFormat::Jpeg => ("jpg", "image/jpeg"),
            ImageFormat::Gif => ("gif", "image/gif"),
            ImageFormat::WebP => ("webp", "image/webp"),
            ImageFormat::Tiff => ("tif", "image/tiff"),
            ImageFormat::Bmp => ("bmp", "image/bmp"),
            ImageFormat::Ico => ("ico", "image/x-icon"),
            ImageFormat::Tga => ("tga", "image/x-tga"),
            ImageFormat::Dds => ("dds", "image/vnd-ms.dds"),
            ImageFormat::Hdr => ("hdr", "image/vnd.radiance"),
            ImageFormat::OpenExr => ("exr", "image/x-exr"),
            ImageFormat::Pnm => ("pnm", "image/x-portable-anymap"),
            ImageFormat::Farbfeld => ("ff", "image/x-farbfeld"),
            ImageFormat::Avif => ("avif", "image/avif"),
            ImageFormat::Qoi => ("qoi", "image/x-qoi"),
            _ => return None,
        };
        Some(pair)
    }
}

fn read_header(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    File::open(path)?.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

impl MetadataPlugin for FileTypePlugin {
    fn name(&self) -> &'static str {
        "filetype"
    }

    fn run(&self, path: &Path) -> Map<String, Value> {
        let Ok(header) = read_header(path, 512) else {
            return Map::new();
        };
        let Some((extension, mime)) = image::guess_format(&header)
            .ok()
            .and_then(Self::describe)
        else {
            return Map::new();
        };

        let (mime_0, mime_1) = mime.split_once('/').unwrap_or((mime, ""));
        let mut map = Map::new();
        map.insert("extension".into(), json!(extension));
        map.insert("mime".into(), json!(mime));
        map.insert("group".into(), json!(mime_0));
        map.insert("mime_0".into(), json!(mime_0));
        map.insert("mime_1".into(), json!(mime_1));
        map
    }
}

/// Pixel dimensions of decodable images
pub struct ImagePlugin;

impl ImagePlugin {
    /// Decoder is picked from the file header, the extension is ignored
    fn dimensions(path: &Path) -> image::ImageResult<(u32, u32)> {
        image::io::Reader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
    }
}

impl MetadataPlugin for ImagePlugin {
    fn name(&self) -> &'static str {
        "image"
    }

    fn run(&self, path: &Path) -> Map<String, Value> {
        let (width, height) = match Self::dimensions(path) {
            Ok(dims) => dims,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no image dimensions");
                return Map::new();
            }
        };
        let orientation = match width.cmp(&height) {
            std::cmp::Ordering::Greater => "landscape",
            std::cmp::Ordering::Less => "portrait",
            std::cmp::Ordering::Equal => "square",
        };
        let mut map = Map::new();
        map.insert("width".into(), json!(width));
        map.insert("height".into(), json!(height));
        map.insert("orientation".into(), json!(orientation));
        map
    }
}

/// Camera data from the EXIF block of JPEG, TIFF, PNG, WebP and HEIF files
pub struct ExifPlugin;

impl ExifPlugin {
    fn text(exif: &exif::Exif, tag: Tag) -> Option<String> {
        let exif::Value::Ascii(parts) = &exif.get_field(tag, In::PRIMARY)?.value else {
            return None;
        };
        let text = String::from_utf8_lossy(parts.first()?)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        (!text.is_empty()).then_some(text)
    }

    fn uint(exif: &exif::Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
    }

    /// Degrees, minutes and seconds as signed decimal degrees
    fn coordinate(exif: &exif::Exif, tag: Tag, reference: Tag, negative: &str) -> Option<f64> {
        let exif::Value::Rational(parts) = &exif.get_field(tag, In::PRIMARY)?.value else {
            return None;
        };
        let [degrees, minutes, seconds] = parts.as_slice() else {
            return None;
        };
        let value = degrees.to_f64() + minutes.to_f64() / 60.0 + seconds.to_f64() / 3600.0;
        if Self::text(exif, reference).as_deref() == Some(negative) {
            Some(-value)
        } else {
            Some(value)
        }
    }

    fn altitude(exif: &exif::Exif) -> Option<f64> {
        let exif::Value::Rational(parts) = &exif.get_field(Tag::GPSAltitude, In::PRIMARY)?.value else {
            return None;
        };
        let meters = parts.first()?.to_f64();
        // reference 1 is below sea level
        if Self::uint(exif, Tag::GPSAltitudeRef) == Some(1) {
            Some(-meters)
        } else {
            Some(meters)
        }
    }

    fn taken(exif: &exif::Exif) -> Option<Value> {
        let text = Self::text(exif, Tag::DateTimeOriginal).or_else(|| Self::text(exif, Tag::DateTime))?;
        let taken = NaiveDateTime::parse_from_str(&text, "%Y:%m:%d %H:%M:%S").ok()?;
        Some(json!({
            "iso": taken.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "year": taken.year(),
            "month": taken.month(),
            "day": taken.day(),
        }))
    }
}

impl MetadataPlugin for ExifPlugin {
    fn name(&self) -> &'static str {
        "exif"
    }

    fn run(&self, path: &Path) -> Map<String, Value> {
        let parsed = File::open(path)
            .map_err(exif::Error::from)
            .and_then(|file| exif::Reader::new().read_from_container(&mut BufReader::new(file)));
        let exif = match parsed {
            Ok(exif) => exif,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no exif data");
                return Map::new();
            }
        };

        let mut map = Map::new();
        for (key, tag) in [("make", Tag::Make), ("model", Tag::Model)] {
            if let Some(text) = Self::text(&exif, tag) {
                map.insert(key.into(), json!(text));
            }
        }
        let numbers: [(&str, &[Tag]); 4] = [
            ("orientation", &[Tag::Orientation]),
            ("flash", &[Tag::Flash]),
            ("width", &[Tag::PixelXDimension, Tag::ImageWidth]),
            ("height", &[Tag::PixelYDimension, Tag::ImageLength]),
        ];
        for (key, tags) in numbers {
            if let Some(value) = tags.iter().find_map(|tag| Self::uint(&exif, *tag)) {
                map.insert(key.into(), json!(value));
            }
        }
        if let Some(taken) = Self::taken(&exif) {
            map.insert("taken".into(), taken);
        }

        let mut gps = Map::new();
        if let Some(lat) = Self::coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S") {
            gps.insert("latitude".into(), json!(lat));
        }
        if let Some(lon) = Self::coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W") {
            gps.insert("longitude".into(), json!(lon));
        }
        if let Some(alt) = Self::altitude(&exif) {
            gps.insert("altitude".into(), json!(alt));
        }
        if !gps.is_empty() {
            map.insert("gps".into(), Value::Object(gps));
        }
        map
    }
}

/// Content digest
pub struct ChecksumPlugin;

impl MetadataPlugin for ChecksumPlugin {
    fn name(&self) -> &'static str {
        "checksum"
    }

    fn run(&self, path: &Path) -> Map<String, Value> {
        let digest = File::open(path).and_then(|mut file| {
            let mut hasher = blake3::Hasher::new();
            io::copy(&mut file, &mut hasher)?;
            Ok(hasher.finalize())
        });
        match digest {
            Ok(hash) => {
                let mut map = Map::new();
                map.insert("blake3".into(), json!(hash.to_hex().to_string()));
                map
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "checksum failed");
                Map::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PNG_1X1, TestTree, tiff_with_exif};

    #[test]
    fn test_lookup_by_name() {
        for name in PLUGIN_NAMES {
            assert_eq!(plugin_by_name(name).map(|p| p.name()), Some(name));
        }
        assert!(plugin_by_name("nonsense").is_none());
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let missing = Path::new("/definitely/not/here #x.jpg");
        for name in PLUGIN_NAMES {
            let plugin = plugin_by_name(name).unwrap();
            assert!(plugin.run(missing).is_empty(), "{name} should yield nothing");
        }
    }

    #[test]
    fn test_stat() {
        let tree = TestTree::new();
        let file = tree.file_with("a #x.txt", b"hello");
        let map = StatPlugin.run(&file);
        assert_eq!(map["size"], json!(5));
        assert!(map["mtime"]["year"].as_i64().unwrap() >= 1970);
    }

    #[test]
    fn test_filetype_and_image() {
        let tree = TestTree::new();
        let file = tree.file_with("pixel #x.bin", PNG_1X1);
        let map = FileTypePlugin.run(&file);
        assert_eq!(map["mime"], json!("image/png"));
        assert_eq!(map["mime_1"], json!("png"));
        let map = ImagePlugin.run(&file);
        assert_eq!(map["width"], json!(1));
        assert_eq!(map["orientation"], json!("square"));
    }

    #[test]
    fn test_image_ignores_misleading_extension() {
        let tree = TestTree::new();
        let file = tree.file_with("pixel #x.jpg", PNG_1X1);
        assert_eq!(ImagePlugin.run(&file)["height"], json!(1));
        let text = tree.file_with("notes #x.png", b"not an image");
        assert!(ImagePlugin.run(&text).is_empty());
    }

    #[test]
    fn test_exif_camera_fields() {
        let tree = TestTree::new();
        let file = tree.file_with("shot #x.tif", &tiff_with_exif());
        let map = ExifPlugin.run(&file);
        assert_eq!(map["make"], json!("Canon"));
        assert_eq!(map["model"], json!("EOS"));
        assert_eq!(map["orientation"], json!(6));
        assert!(!map.contains_key("gps"));
    }

    #[test]
    fn test_exif_of_plain_image_is_empty() {
        let tree = TestTree::new();
        let png = tree.file_with("pixel #x.png", PNG_1X1);
        assert!(ExifPlugin.run(&png).is_empty());
        let text = tree.file_with("plain #x.txt", b"just some words");
        assert!(ExifPlugin.run(&text).is_empty());
    }

    #[test]
    fn test_filetype_of_text_is_empty() {
        let tree = TestTree::new();
        let file = tree.file_with("plain #x.txt", b"just some words");
        assert!(FileTypePlugin.run(&file).is_empty());
    }

    #[test]
    fn test_checksum_is_stable() {
        let tree = TestTree::new();
        let a = tree.file_with("a #x", b"same");
        let b = tree.file_with("b #x", b"same");
        assert_eq!(ChecksumPlugin.run(&a), ChecksumPlugin.run(&b));
        assert_eq!(ChecksumPlugin.run(&a)["blake3"].as_str().unwrap().len(), 64);
    }
}
