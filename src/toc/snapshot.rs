//! Structured, serializable snapshot of a TOC.
//!
//! The snapshot mirrors everything [`crate::FileToc::put`] would write - header fields
//! and the full load sequence including generic command payloads - while omitting
//! section payload bytes (which are never part of the TOC) and the opaque function
//! cache. It exists for external tooling that wants a stable, lossless view of the
//! TOC without decoding the binary image.

use serde::Serialize;

use crate::Result;

/// Serializable snapshot of a whole TOC.
#[derive(Debug, Clone, Serialize)]
pub struct TocSnapshot {
    /// Header field values
    pub header: HeaderSnapshot,
    /// Byte order every multi-byte field is encoded with
    pub byte_order: &'static str,
    /// The load sequence in on-disk order
    pub loads: Vec<LoadSnapshot>,
}

impl TocSnapshot {
    /// Renders the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`crate::Error::JsonError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Header fields of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderSnapshot {
    /// Raw magic value
    pub magic: u32,
    /// CPU type field
    pub cpu_type: u32,
    /// CPU subtype field
    pub cpu_subtype: u32,
    /// File type name
    pub file_type: String,
    /// Number of load commands
    pub ncmds: u32,
    /// Total encoded size of all load commands
    pub sizeof_cmds: u32,
    /// Raw header flag bits
    pub flags: u32,
}

/// One load command in a snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum LoadSnapshot {
    /// A generic command with its pre-encoded payload
    Command {
        /// Raw command identifier
        cmd: u32,
        /// Conventional command name, or the identifier in hex
        name: String,
        /// Payload bytes following the 8-byte prefix
        payload: Vec<u8>,
    },
    /// A segment with its owned section headers
    Segment {
        /// Raw command identifier
        cmd: u32,
        /// Segment name
        name: String,
        /// Starting virtual address
        vmaddr: u64,
        /// Size in memory
        vmsize: u64,
        /// File offset of the segment's data
        fileoff: u64,
        /// Number of file-resident bytes
        filesz: u64,
        /// Maximum protection bits
        maxprot: u32,
        /// Initial protection bits
        initprot: u32,
        /// Segment flag bits
        flags: u32,
        /// Owned section headers, in table order
        sections: Vec<SectionSnapshot>,
    },
}

/// One section header in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SectionSnapshot {
    /// Section name
    pub name: String,
    /// Owning segment name
    pub seg_name: String,
    /// Virtual address
    pub addr: u64,
    /// Size in memory
    pub size: u64,
    /// File offset
    pub offset: u32,
    /// Alignment as a power of two
    pub align: u32,
    /// Relocation table offset
    pub reloff: u32,
    /// Relocation entry count
    pub nreloc: u32,
    /// Type and attribute bits
    pub flags: u32,
}
