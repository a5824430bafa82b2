//! Text file reading with memory mapping for large inputs.
//!
//! Vocabulary files, context passages and JSON configuration all enter the
//! process through [`read_text`]. Passages can be arbitrarily long, so files
//! past [`MMAP_THRESHOLD`] are mapped instead of streamed.

// Memory mapping requires unsafe; the mapping is read-only and dropped before return
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Threshold for using memory mapping (1MB).
pub const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum file size accepted (256MB).
const MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// UTF-8 byte order mark, stripped from the start of text files.
const UTF8_BOM: &str = "\u{feff}";

/// An opened text file.
///
/// # Examples
///
/// ```no_run
/// use qa_rs::io::TextFile;
///
/// let file = TextFile::open("passage.txt").unwrap();
/// let text = file.read().unwrap();
/// ```
pub struct TextFile {
    file: File,
    size: u64,
    path: String,
}

impl TextFile {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::FileNotFound`] if the path does not exist and
    /// [`IoError::ReadFailed`] if it cannot be opened or is too large.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref).map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let size = file
            .metadata()
            .map_err(|e| IoError::ReadFailed {
                path: path_str.clone(),
                reason: e.to_string(),
            })?
            .len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the whole file as UTF-8 text, without a leading byte order mark.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the content is not valid UTF-8.
    pub fn read(&self) -> Result<String> {
        let bytes = if self.size >= MMAP_THRESHOLD {
            self.read_mmap()?
        } else {
            self.read_direct()?
        };

        let mut text = String::from_utf8(bytes).map_err(|e| IoError::InvalidUtf8 {
            path: self.path.clone(),
            offset: e.utf8_error().valid_up_to(),
        })?;

        if text.starts_with(UTF8_BOM) {
            text.drain(..UTF8_BOM.len());
        }
        Ok(text)
    }

    fn read_mmap(&self) -> Result<Vec<u8>> {
        // Safety: read-only mapping, copied out before the map is dropped
        let mmap = unsafe {
            Mmap::map(&self.file).map_err(|e| IoError::MmapFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
        };
        Ok(mmap.to_vec())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_direct(&self) -> Result<Vec<u8>> {
        let mut file = &self.file;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }
}

/// Reads a text file, choosing direct reads or memory mapping by size.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    TextFile::open(path)?.read()
}
