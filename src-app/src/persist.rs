//! Writing captured images to disk.
//!
//! Files are named `<prefix>-<W>x<H>-<yyyy-MM-dd-HH-mm-ss>.png`, with `-1`,
//! `-2`, ... appended when a name is taken. The PNG is written to a hidden
//! temporary file first and then moved into place without replacing
//! anything, so a partially written image never appears under its final name.

use crate::capture::{CaptureError, CapturedFrame};
use chrono::{DateTime, Local};
use extshot_types::PresetSize;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default file name prefix.
pub const DEFAULT_FILE_PREFIX: &str = "screenshot";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Error type for saving images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// PNG encoding failed
    EncodeFailed(String),
    /// The output directory or file could not be written
    Io(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::EncodeFailed(msg) => write!(f, "Failed to encode PNG: {}", msg),
            PersistError::Io(msg) => write!(f, "Failed to write image: {}", msg),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<PersistError> for String {
    fn from(err: PersistError) -> Self {
        err.to_string()
    }
}

impl From<PersistError> for CaptureError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::EncodeFailed(msg) => CaptureError::EncodeFailed(msg),
            PersistError::Io(msg) => CaptureError::Io(msg),
        }
    }
}

/// Saves [`CapturedFrame`]s as PNG files in one directory.
#[derive(Debug, Clone)]
pub struct ImagePersister {
    output_dir: PathBuf,
    file_prefix: String,
}

impl ImagePersister {
    pub fn new(output_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save `frame` stamped with the current local time.
    pub fn save(&self, frame: CapturedFrame) -> Result<PathBuf, PersistError> {
        self.save_at(frame, Local::now())
    }

    /// Save `frame` stamped with `timestamp`; returns the final path.
    pub fn save_at(
        &self,
        frame: CapturedFrame,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf, PersistError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            PersistError::Io(format!(
                "cannot create {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let png = encode_png(&frame)?;
        let stem = self.file_stem(frame.preset, &timestamp);

        let temp = write_temp_file(&self.output_dir, &png).map_err(|e| {
            PersistError::Io(format!(
                "temporary file in {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let result = self.place(temp, &stem);
        let path = result?;
        info!(
            "Saved {}x{} screenshot to {}",
            frame.width(),
            frame.height(),
            path.display()
        );
        Ok(path)
    }

    fn file_stem(&self, preset: PresetSize, timestamp: &DateTime<Local>) -> String {
        format!(
            "{}-{}-{}",
            self.file_prefix,
            preset,
            timestamp.format(TIMESTAMP_FORMAT)
        )
    }

    /// Move the finished temp file to the first free name, never replacing
    /// an existing file. The temp file is removed if no name is taken.
    fn place(&self, mut temp: NamedTempFile, stem: &str) -> Result<PathBuf, PersistError> {
        for n in 0..=u32::MAX {
            let name = if n == 0 {
                format!("{}.png", stem)
            } else {
                format!("{}-{}.png", stem, n)
            };
            let candidate = self.output_dir.join(name);

            match temp.persist_noclobber(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next suffix", candidate.display());
                    temp = e.file;
                }
                Err(e) => {
                    return Err(PersistError::Io(format!(
                        "{}: {}",
                        candidate.display(),
                        e.error
                    )));
                }
            }
        }
        Err(PersistError::Io(format!(
            "no free file name for {} in {}",
            stem,
            self.output_dir.display()
        )))
    }
}

/// Encode as PNG with the strongest compression. Lossless either way.
fn encode_png(frame: &CapturedFrame) -> Result<Vec<u8>, PersistError> {
    let mut png = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut png, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(
            frame.image.as_raw(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| PersistError::EncodeFailed(e.to_string()))?;
    Ok(png)
}

/// Hidden temp file in `dir` holding `bytes`, flushed to disk.
fn write_temp_file(dir: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let mut temp = tempfile::Builder::new()
        .prefix(".extshot-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}
