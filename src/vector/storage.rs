//! On-disk format for the flat vector index.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic `SVEC`, version, dimension, slot count
//! - Rows: contiguous f32 arrays in little-endian format, one per slot
//!
//! All header fields are little-endian u32. The file is always rewritten as
//! a whole: rows go to a temporary file in the same directory which is then
//! renamed over the previous artifact, so a reader sees either the old or the
//! new snapshot. Reads go through a memory map.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::vector::{FlatIndex, VectorDimension, VectorError};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector storage files.
const MAGIC_BYTES: &[u8; 4] = b"SVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Errors specific to vector storage operations.
#[derive(Error, Debug)]
pub enum VectorStorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error(
        "Invalid storage version: expected {expected}, got {actual}\nSuggestion: Rebuild the index with this version"
    )]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),
}

/// Vector artifact of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorFile {
    path: PathBuf,
}

impl VectorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks if the artifact exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes every row of `index`, replacing the previous artifact.
    pub fn write(&self, index: &FlatIndex) -> Result<(), VectorStorageError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let slot_count = u32::try_from(index.len()).map_err(|_| VectorError::SlotSpaceExhausted)?;
        let dimension = u32::try_from(index.dimension().get()).map_err(|_| {
            VectorStorageError::InvalidFormat("dimension does not fit the header".to_string())
        })?;

        let mut temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            writer.write_all(MAGIC_BYTES)?;
            writer.write_all(&STORAGE_VERSION.to_le_bytes())?;
            writer.write_all(&dimension.to_le_bytes())?;
            writer.write_all(&slot_count.to_le_bytes())?;
            for &value in index.as_slice() {
                writer.write_all(&value.to_le_bytes())?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Reads the artifact back into a flat index.
    pub fn read(&self) -> Result<FlatIndex, VectorStorageError> {
        let file = File::open(&self.path)?;
        if file.metadata()?.len() < HEADER_SIZE as u64 {
            return Err(VectorStorageError::InvalidFormat(
                "File too small to contain header".to_string(),
            ));
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let (dimension, slot_count) = read_header(&mmap)?;

        let expected_len = slot_count
            .checked_mul(dimension.get() * BYTES_PER_F32)
            .and_then(|payload| payload.checked_add(HEADER_SIZE))
            .ok_or_else(|| VectorStorageError::InvalidFormat("Header overflow".to_string()))?;
        if mmap.len() != expected_len {
            return Err(VectorStorageError::InvalidFormat(format!(
                "Expected {expected_len} bytes for {slot_count} slots, found {}",
                mmap.len()
            )));
        }

        let data: Vec<f32> = mmap[HEADER_SIZE..]
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(FlatIndex::from_raw(dimension, data)?)
    }
}

fn read_header(bytes: &[u8]) -> Result<(VectorDimension, usize), VectorStorageError> {
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(VectorStorageError::InvalidFormat(
            "Invalid magic bytes".to_string(),
        ));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != STORAGE_VERSION {
        return Err(VectorStorageError::VersionMismatch {
            expected: STORAGE_VERSION,
            actual: version,
        });
    }

    let dim_value = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let dimension = VectorDimension::new(dim_value as usize)?;

    let slot_count = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

    Ok((dimension, slot_count))
}
