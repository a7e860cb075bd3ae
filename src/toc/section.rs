//! Section headers: named sub-regions of a segment's data.
//!
//! Sections live in the shared, append-ordered section table owned by
//! [`crate::FileToc`]; a segment never owns or copies its sections, it only references
//! a contiguous run of the table by start index and count. The two on-disk widths are
//! serialized by [`Section::put32`] and [`Section::put64`], chosen by the container
//! magic at write time.

use std::fmt;

use crate::{
    file::io::{write_name_at, ByteOrder},
    Result,
};

/// A section header describing a named sub-region of a segment.
///
/// Only the header is modeled here; section payload bytes live outside the TOC and are
/// never written by this library.
#[derive(Debug, Clone, Default)]
pub struct Section {
    /// Section name (at most 16 bytes on disk, NUL-padded)
    pub name: String,
    /// Name of the segment this section belongs to
    pub seg_name: String,
    /// Virtual address of the section's data
    pub addr: u64,
    /// Size of the section's data in memory
    pub size: u64,
    /// File offset of the section's data
    pub offset: u32,
    /// Alignment as a power of two
    pub align: u32,
    /// File offset of the section's relocation entries
    pub reloff: u32,
    /// Number of relocation entries
    pub nreloc: u32,
    /// Type and attribute bits, carried uninterpreted
    pub flags: u32,
    /// Reserved field (interpretation depends on the section type)
    pub reserved1: u32,
    /// Reserved field (interpretation depends on the section type)
    pub reserved2: u32,
    /// Reserved field, present in the 64-bit form only
    pub reserved3: u32,
}

impl Section {
    /// Encoded size of the 32-bit section header form.
    pub const HEADER_SIZE_32: u32 = 68;
    /// Encoded size of the 64-bit section header form.
    pub const HEADER_SIZE_64: u32 = 80;

    /// Creates a zeroed section header with the given section and segment names.
    #[must_use]
    pub fn new(name: impl Into<String>, seg_name: impl Into<String>) -> Self {
        Section {
            name: name.into(),
            seg_name: seg_name.into(),
            ..Section::default()
        }
    }

    /// Serializes the 32-bit header form, returning the bytes written.
    ///
    /// The 64-bit address and size fields are narrowed as the 32-bit layout requires.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer lacks space.
    pub fn put32(&self, buffer: &mut [u8], order: ByteOrder) -> Result<usize> {
        let mut offset = 0;
        write_name_at(buffer, &mut offset, &self.name)?;
        write_name_at(buffer, &mut offset, &self.seg_name)?;
        order.write_at(buffer, &mut offset, self.addr as u32)?;
        order.write_at(buffer, &mut offset, self.size as u32)?;
        order.write_at(buffer, &mut offset, self.offset)?;
        order.write_at(buffer, &mut offset, self.align)?;
        order.write_at(buffer, &mut offset, self.reloff)?;
        order.write_at(buffer, &mut offset, self.nreloc)?;
        order.write_at(buffer, &mut offset, self.flags)?;
        order.write_at(buffer, &mut offset, self.reserved1)?;
        order.write_at(buffer, &mut offset, self.reserved2)?;
        Ok(offset)
    }

    /// Serializes the 64-bit header form, returning the bytes written.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer lacks space.
    pub fn put64(&self, buffer: &mut [u8], order: ByteOrder) -> Result<usize> {
        let mut offset = 0;
        write_name_at(buffer, &mut offset, &self.name)?;
        write_name_at(buffer, &mut offset, &self.seg_name)?;
        order.write_at(buffer, &mut offset, self.addr)?;
        order.write_at(buffer, &mut offset, self.size)?;
        order.write_at(buffer, &mut offset, self.offset)?;
        order.write_at(buffer, &mut offset, self.align)?;
        order.write_at(buffer, &mut offset, self.reloff)?;
        order.write_at(buffer, &mut offset, self.nreloc)?;
        order.write_at(buffer, &mut offset, self.flags)?;
        order.write_at(buffer, &mut offset, self.reserved1)?;
        order.write_at(buffer, &mut offset, self.reserved2)?;
        order.write_at(buffer, &mut offset, self.reserved3)?;
        Ok(offset)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "     {:<16} addr={:#x} size={:#x} off={} align=2^{} flags={:#x}",
            self.name, self.addr, self.size, self.offset, self.align, self.flags
        )
    }
}
