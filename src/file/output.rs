//! Memory-mapped file handling for TOC image emission.
//!
//! This module provides the [`Output`] type for managing memory-mapped output files when
//! a TOC image is written straight to disk instead of into a caller-owned buffer. The
//! mapping is sized up front from the TOC's computed file size, filled through the normal
//! [`crate::FileToc::put`] path, and either finalized in place or cleaned up on drop.
//!
//! # Key Components
//!
//! - [`Output`] - Memory-mapped output file with explicit finalization
//!
//! # Thread Safety
//!
//! [`Output`] is not shared between threads; it holds a mutable mapping tied to the
//! creating thread for the duration of one emission.

use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::{Error, Result};

/// A memory-mapped output file sized up front and finalized explicitly.
///
/// The file is created directly at the target path and mapped into memory for
/// random-access writes. If the output is dropped without being finalized, the
/// incomplete file is removed; after [`Output::finalize`] it remains at the target
/// path.
pub struct Output {
    /// The memory mapping of the target file
    mmap: MmapMut,

    /// The target path
    target_path: PathBuf,

    /// Whether the file has been finalized
    finalized: bool,
}

impl Output {
    /// Creates a new memory-mapped output file of `size` bytes at `target_path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::WriteMmapFailed`] if file creation, sizing, or mapping
    /// fails.
    pub fn create<P: AsRef<Path>>(target_path: P, size: u64) -> Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target_path)
            .map_err(|e| Error::WriteMmapFailed {
                message: format!("Failed to create target file: {e}"),
            })?;

        file.set_len(size).map_err(|e| Error::WriteMmapFailed {
            message: format!("Failed to set file size: {e}"),
        })?;

        let mmap = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|e| Error::WriteMmapFailed {
                    message: format!("Failed to create memory mapping: {e}"),
                })?
        };

        debug!(path = %target_path.display(), size, "created mapped output file");

        Ok(Self {
            mmap,
            target_path,
            finalized: false,
        })
    }

    /// Gets a mutable slice to the entire file contents.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap[..]
    }

    /// Writes data at a specific offset in the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteMmapFailed`] if the write would exceed file bounds.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + data.len();

        if end > self.mmap.len() {
            return Err(Error::WriteMmapFailed {
                message: format!(
                    "Write would exceed file size: offset={}, len={}, file_size={}",
                    offset,
                    data.len(),
                    self.mmap.len()
                ),
            });
        }

        self.mmap[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Gets the total size of the file.
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Flushes any pending writes to disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteMmapFailed`] if the flush operation fails.
    pub fn flush(&mut self) -> Result<()> {
        self.mmap.flush().map_err(|e| Error::WriteMmapFailed {
            message: format!("Failed to flush memory mapping: {e}"),
        })
    }

    /// Finalizes the file by flushing all pending writes and marking it complete.
    ///
    /// After this call the file remains at the target path; without it the file is
    /// removed when the [`Output`] is dropped.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteFinalizationFailed`] if the flush fails.
    pub fn finalize(mut self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| Error::WriteFinalizationFailed {
                message: format!("Failed to flush memory mapping: {e}"),
            })?;

        self.finalized = true;
        debug!(path = %self.target_path.display(), "finalized output file");
        Ok(())
    }

    /// Gets the target path where the file is created.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if !self.finalized {
            // Incomplete image: flush what we can, then remove the file
            let _ = self.flush();
            let _ = std::fs::remove_file(&self.target_path);
        }
    }
}
