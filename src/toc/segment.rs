//! Segment load commands.
//!
//! A segment describes a contiguous region of address space and file data and owns a
//! run of section headers. Ownership is by reference into the shared section table of
//! [`crate::FileToc`]: a segment records only the index of its first section and a
//! count, both managed by the TOC's `add_segment`/`add_section` operations, and the
//! runs of all segments tile the table in append order with no gaps or overlap.

use std::fmt;

use bitflags::bitflags;

use crate::{
    file::io::{write_name_at, ByteOrder},
    toc::{
        header::{Magic, Width},
        load::LoadCmd,
        section::Section,
    },
    Result,
};

bitflags! {
    /// Virtual memory protection bits for a segment mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VmProt: u32 {
        /// Pages may be read
        const READ = 0x1;
        /// Pages may be written
        const WRITE = 0x2;
        /// Pages may be executed
        const EXECUTE = 0x4;
    }
}

bitflags! {
    /// Segment flags (`SG_*` constants).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SegmentFlags: u32 {
        /// File contents occupy the high part of the VM space
        const HIGHVM = 0x1;
        /// Allocated by a fixed VM library
        const FVMLIB = 0x2;
        /// May hold no relocated pointers
        const NORELOC = 0x4;
        /// Protected segment (version 1)
        const PROTECTED_VERSION_1 = 0x8;
        /// Mapped read-only after fixups
        const READ_ONLY = 0x10;
    }
}

/// A segment load command.
///
/// The command kind ([`LoadCmd::SEGMENT`] or [`LoadCmd::SEGMENT_64`]) and running
/// encoded size are derived from the container magic at construction; the section
/// bookkeeping fields are managed exclusively by [`crate::FileToc`].
#[derive(Debug, Clone)]
pub struct Segment {
    /// Segment name (at most 16 bytes on disk, NUL-padded)
    pub name: String,
    /// Starting virtual address
    pub vmaddr: u64,
    /// Size of the segment in memory
    pub vmsize: u64,
    /// File offset of the segment's data
    pub fileoff: u64,
    /// Number of file-resident bytes
    pub filesz: u64,
    /// Maximum permitted protection
    pub maxprot: VmProt,
    /// Initial protection
    pub initprot: VmProt,
    /// Segment flag bits
    pub flags: SegmentFlags,

    pub(crate) cmd: LoadCmd,
    pub(crate) len: u32,
    pub(crate) nsect: u32,
    pub(crate) firstsect: u32,
}

impl Segment {
    /// Encoded size of the 32-bit segment command, excluding section headers.
    pub const COMMAND_SIZE_32: u32 = 56;
    /// Encoded size of the 64-bit segment command, excluding section headers.
    pub const COMMAND_SIZE_64: u32 = 72;

    /// Creates an empty segment for a container of the given magic.
    ///
    /// The magic fixes the command kind and the base encoded size; this is the point
    /// where the segment sizing path rejects containers this library cannot emit.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for the fat magic or any
    /// unrecognized value.
    pub fn new(name: impl Into<String>, magic: Magic) -> Result<Self> {
        let (cmd, len) = match magic.width()? {
            Width::Bits32 => (LoadCmd::SEGMENT, Self::COMMAND_SIZE_32),
            Width::Bits64 => (LoadCmd::SEGMENT_64, Self::COMMAND_SIZE_64),
        };

        Ok(Segment {
            name: name.into(),
            vmaddr: 0,
            vmsize: 0,
            fileoff: 0,
            filesz: 0,
            maxprot: VmProt::empty(),
            initprot: VmProt::empty(),
            flags: SegmentFlags::empty(),
            cmd,
            len,
            nsect: 0,
            firstsect: 0,
        })
    }

    /// Returns the command identifier of this segment.
    #[must_use]
    pub fn cmd(&self) -> LoadCmd {
        self.cmd
    }

    /// Returns the encoded size of this command including its owned section headers.
    #[must_use]
    pub fn load_size(&self) -> u32 {
        self.len
    }

    /// Returns the number of sections this segment owns.
    #[must_use]
    pub fn nsect(&self) -> u32 {
        self.nsect
    }

    /// Returns the index into the shared section table of this segment's first section.
    #[must_use]
    pub fn firstsect(&self) -> u32 {
        self.firstsect
    }

    /// Returns the width-appropriate encoded size of one owned section header.
    pub(crate) fn section_header_size(&self) -> u32 {
        if self.cmd == LoadCmd::SEGMENT_64 {
            Section::HEADER_SIZE_64
        } else {
            Section::HEADER_SIZE_32
        }
    }

    /// Serializes the 32-bit command form, returning the bytes written.
    ///
    /// The 64-bit address and size fields are narrowed as the 32-bit layout requires.
    /// Owned section headers are written separately by [`crate::FileToc::put`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer lacks space.
    pub fn put32(&self, buffer: &mut [u8], order: ByteOrder) -> Result<usize> {
        let mut offset = 0;
        order.write_at(buffer, &mut offset, self.cmd.value())?;
        order.write_at(buffer, &mut offset, self.len)?;
        write_name_at(buffer, &mut offset, &self.name)?;
        order.write_at(buffer, &mut offset, self.vmaddr as u32)?;
        order.write_at(buffer, &mut offset, self.vmsize as u32)?;
        order.write_at(buffer, &mut offset, self.fileoff as u32)?;
        order.write_at(buffer, &mut offset, self.filesz as u32)?;
        order.write_at(buffer, &mut offset, self.maxprot.bits())?;
        order.write_at(buffer, &mut offset, self.initprot.bits())?;
        order.write_at(buffer, &mut offset, self.nsect)?;
        order.write_at(buffer, &mut offset, self.flags.bits())?;
        Ok(offset)
    }

    /// Serializes the 64-bit command form, returning the bytes written.
    ///
    /// Owned section headers are written separately by [`crate::FileToc::put`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer lacks space.
    pub fn put64(&self, buffer: &mut [u8], order: ByteOrder) -> Result<usize> {
        let mut offset = 0;
        order.write_at(buffer, &mut offset, self.cmd.value())?;
        order.write_at(buffer, &mut offset, self.len)?;
        write_name_at(buffer, &mut offset, &self.name)?;
        order.write_at(buffer, &mut offset, self.vmaddr)?;
        order.write_at(buffer, &mut offset, self.vmsize)?;
        order.write_at(buffer, &mut offset, self.fileoff)?;
        order.write_at(buffer, &mut offset, self.filesz)?;
        order.write_at(buffer, &mut offset, self.maxprot.bits())?;
        order.write_at(buffer, &mut offset, self.initprot.bits())?;
        order.write_at(buffer, &mut offset, self.nsect)?;
        order.write_at(buffer, &mut offset, self.flags.bits())?;
        Ok(offset)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<16} addr={:#x} vmsize={:#x} off={} filesz={} prot={:?}/{:?} sects={}",
            self.cmd,
            self.name,
            self.vmaddr,
            self.vmsize,
            self.fileoff,
            self.filesz,
            self.initprot,
            self.maxprot,
            self.nsect
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::io::{read_le_at, read_name_at};
    use crate::Error;

    #[test]
    fn test_new_derives_kind_from_magic() {
        let seg32 = Segment::new("__TEXT", Magic::MAGIC_32).unwrap();
        assert_eq!(seg32.cmd(), LoadCmd::SEGMENT);
        assert_eq!(seg32.load_size(), Segment::COMMAND_SIZE_32);

        let seg64 = Segment::new("__TEXT", Magic::MAGIC_64).unwrap();
        assert_eq!(seg64.cmd(), LoadCmd::SEGMENT_64);
        assert_eq!(seg64.load_size(), Segment::COMMAND_SIZE_64);
    }

    #[test]
    fn test_new_rejects_unsupported_magic() {
        assert!(matches!(
            Segment::new("__TEXT", Magic::MAGIC_FAT),
            Err(Error::UnsupportedFormat { magic: 0xcafe_babe })
        ));
        assert!(matches!(
            Segment::new("__TEXT", Magic(0x1234_5678)),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_put64_layout() {
        let mut seg = Segment::new("__DATA", Magic::MAGIC_64).unwrap();
        seg.vmaddr = 0x1_0000_4000;
        seg.vmsize = 0x4000;
        seg.fileoff = 0x4000;
        seg.filesz = 0x2000;
        seg.maxprot = VmProt::READ | VmProt::WRITE;
        seg.initprot = VmProt::READ | VmProt::WRITE;

        let mut buffer = [0u8; Segment::COMMAND_SIZE_64 as usize];
        let written = seg.put64(&mut buffer, ByteOrder::LittleEndian).unwrap();
        assert_eq!(written as u32, Segment::COMMAND_SIZE_64);

        let mut offset = 0;
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x19);
        assert_eq!(
            read_le_at::<u32>(&buffer, &mut offset).unwrap(),
            Segment::COMMAND_SIZE_64
        );
        assert_eq!(read_name_at(&buffer, &mut offset).unwrap(), "__DATA");
        assert_eq!(
            read_le_at::<u64>(&buffer, &mut offset).unwrap(),
            0x1_0000_4000
        );
        assert_eq!(read_le_at::<u64>(&buffer, &mut offset).unwrap(), 0x4000);
        assert_eq!(read_le_at::<u64>(&buffer, &mut offset).unwrap(), 0x4000);
        assert_eq!(read_le_at::<u64>(&buffer, &mut offset).unwrap(), 0x2000);
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x3);
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x3);
    }

    #[test]
    fn test_put32_layout() {
        let mut seg = Segment::new("__TEXT", Magic::MAGIC_32).unwrap();
        seg.vmaddr = 0x1000;
        seg.vmsize = 0x2000;

        let mut buffer = [0u8; Segment::COMMAND_SIZE_32 as usize];
        let written = seg.put32(&mut buffer, ByteOrder::LittleEndian).unwrap();
        assert_eq!(written as u32, Segment::COMMAND_SIZE_32);

        let mut offset = 0;
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x1);
        assert_eq!(
            read_le_at::<u32>(&buffer, &mut offset).unwrap(),
            Segment::COMMAND_SIZE_32
        );
        assert_eq!(read_name_at(&buffer, &mut offset).unwrap(), "__TEXT");
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x1000);
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x2000);
    }
}
