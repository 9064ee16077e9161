use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::errors::{ClientError, Result};

// @module: File and payload utilities

/// Extensions treated as video when scanning directories
const VIDEO_EXTENSIONS: [&str; 14] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Whether `path` has a video extension
    pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Video files directly inside `dir`, sorted by name
    pub fn find_videos<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut videos = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && Self::is_video_file(&path) {
                videos.push(path);
            }
        }
        videos.sort();
        Ok(videos)
    }

    /// Write `content` to `path`, creating parent directories
    ///
    /// With `atomic`, the bytes land in a temporary file in the same directory
    /// that is then renamed over `path`, so readers never see a partial file.
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8], atomic: bool) -> Result<()> {
        let path = path.as_ref();
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            Self::ensure_dir(parent)?;
        }

        if !atomic {
            fs::write(path, content)?;
            return Ok(());
        }

        let mut temp = NamedTempFile::new_in(parent.unwrap_or(Path::new(".")))?;
        temp.write_all(content)?;
        temp.flush()?;
        temp.persist(path).map_err(|e| ClientError::Io(e.error))?;
        debug!("Wrote {} bytes to {:?}", content.len(), path);
        Ok(())
    }

    /// Decode a base64 encoded gzip payload as sent by the service
    pub fn decode_payload(encoded: &str) -> Result<Vec<u8>> {
        // The service wraps long base64 lines
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let compressed = STANDARD.decode(compact.as_bytes())?;

        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| ClientError::Decode(format!("gzip payload: {}", e)))?;
        Ok(decoded)
    }

    /// Decode subtitle bytes as text in their declared `encoding`
    ///
    /// Labels follow the WHATWG encoding names (`CP1252`, `ISO-8859-2`, ...).
    /// An unknown label falls back to lossy UTF-8.
    pub fn decode_text(bytes: &[u8], encoding: &str) -> String {
        let label = encoding.trim();
        let charset = if label.is_empty() {
            UTF_8
        } else {
            match Encoding::for_label(label.as_bytes()) {
                Some(charset) => charset,
                None => {
                    warn!("Unknown subtitle encoding '{}', decoding lossily as UTF-8", encoding);
                    UTF_8
                }
            }
        };

        let (text, used, had_errors) = charset.decode(bytes);
        if had_errors {
            warn!("Subtitles are not valid {}, some characters were replaced", used.name());
        }
        text.into_owned()
    }
}
