//! Mach-O file header, magic discriminators, and header-level constants.
//!
//! The header leads the TOC image and fixes the two properties every later structure
//! depends on: the container width (32-bit or 64-bit layouts, chosen by [`Magic`]) and
//! the byte order. It also carries the running bookkeeping fields `ncmds` and
//! `sizeof_cmds` that [`crate::FileToc`] maintains across mutations.

use std::fmt;

use bitflags::bitflags;
use strum::{EnumCount, EnumIter};

use crate::{file::io::ByteOrder, Error, Result};

/// CPU type of 32-bit x86 headers.
pub const CPU_TYPE_X86: u32 = 0x0000_0007;
/// CPU type of 64-bit x86 headers.
pub const CPU_TYPE_X86_64: u32 = 0x0100_0007;
/// CPU type of 32-bit ARM headers.
pub const CPU_TYPE_ARM: u32 = 0x0000_000C;
/// CPU type of 64-bit ARM headers.
pub const CPU_TYPE_ARM64: u32 = 0x0100_000C;

/// The leading discriminator value identifying the container's word width.
///
/// The magic selects between the 32-bit and 64-bit structure layouts used by every
/// width-dependent operation in the library, or marks a multi-architecture ("fat")
/// container, which this library does not represent or emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Magic(pub u32);

impl Magic {
    /// 32-bit container magic (`MH_MAGIC`)
    pub const MAGIC_32: Magic = Magic(0xfeed_face);
    /// 64-bit container magic (`MH_MAGIC_64`)
    pub const MAGIC_64: Magic = Magic(0xfeed_facf);
    /// Multi-architecture container magic (`FAT_MAGIC`) - recognized but unsupported
    pub const MAGIC_FAT: Magic = Magic(0xcafe_babe);

    /// Returns the raw magic value
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Returns the structure width this magic selects.
    ///
    /// This is the single point every size, alignment, and serialization query derives
    /// its width from.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for the fat magic or any
    /// unrecognized value.
    pub fn width(self) -> Result<Width> {
        match self {
            Magic::MAGIC_32 => Ok(Width::Bits32),
            Magic::MAGIC_64 => Ok(Width::Bits64),
            _ => Err(Error::UnsupportedFormat { magic: self.0 }),
        }
    }

    /// Returns true for the 64-bit container magic.
    #[must_use]
    pub fn is_64bit(self) -> bool {
        self == Magic::MAGIC_64
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Structure width selected by a recognized [`Magic`].
///
/// Exactly two widths exist; every width-conditional encoded size in the library is a
/// named constant per structure-and-width pair rather than a host-layout `sizeof`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 32-bit structure layouts
    Bits32,
    /// 64-bit structure layouts
    Bits64,
}

/// The file type field of a Mach-O header.
///
/// The numeric values correspond to the `MH_*` file type constants of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount, EnumIter)]
#[repr(u32)]
pub enum FileType {
    /// Relocatable object file
    Object = 1,
    /// Demand-paged executable
    Execute = 2,
    /// Fixed VM shared library
    FvmLib = 3,
    /// Core dump
    Core = 4,
    /// Preloaded executable
    Preload = 5,
    /// Dynamically bound shared library
    Dylib = 6,
    /// Dynamic link editor
    Dylinker = 7,
    /// Dynamically bound bundle
    Bundle = 8,
    /// Shared library stub for static linking
    DylibStub = 9,
    /// Companion debug-symbol file
    Dsym = 10,
    /// Kernel extension bundle
    KextBundle = 11,
}

impl FileType {
    /// Converts a raw header field value into a file type, if recognized.
    #[must_use]
    pub fn from_value(value: u32) -> Option<FileType> {
        use strum::IntoEnumIterator;
        FileType::iter().find(|t| *t as u32 == value)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Object => "OBJECT",
            FileType::Execute => "EXECUTE",
            FileType::FvmLib => "FVMLIB",
            FileType::Core => "CORE",
            FileType::Preload => "PRELOAD",
            FileType::Dylib => "DYLIB",
            FileType::Dylinker => "DYLINKER",
            FileType::Bundle => "BUNDLE",
            FileType::DylibStub => "DYLIB_STUB",
            FileType::Dsym => "DSYM",
            FileType::KextBundle => "KEXT_BUNDLE",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Header flags (`MH_*` flag constants).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeaderFlags: u32 {
        /// No undefined references
        const NOUNDEFS = 0x0000_0001;
        /// Input for the dynamic linker
        const DYLDLINK = 0x0000_0004;
        /// Uses two-level namespace bindings
        const TWOLEVEL = 0x0000_0080;
        /// Stacks may be marked executable
        const ALLOW_STACK_EXECUTION = 0x0002_0000;
        /// Position independent executable
        const PIE = 0x0020_0000;
        /// Heap pages are never executable
        const NO_HEAP_EXECUTION = 0x0100_0000;
    }
}

/// The Mach-O file header.
///
/// Owned by value inside [`crate::FileToc`]; `ncmds` and `sizeof_cmds` are maintained
/// by the TOC's mutation operations and must not be adjusted by hand while loads are
/// being added.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Width/endianness discriminator
    pub magic: Magic,
    /// CPU type the image targets
    pub cpu_type: u32,
    /// CPU subtype the image targets
    pub cpu_subtype: u32,
    /// Kind of file this header leads
    pub file_type: FileType,
    /// Number of load commands that follow the header
    pub ncmds: u32,
    /// Total encoded size of all load commands, including inline section headers
    pub sizeof_cmds: u32,
    /// Header flag bits
    pub flags: HeaderFlags,
}

impl FileHeader {
    /// Encoded size of the 32-bit header form.
    pub const SIZE_32: u32 = 28;
    /// Encoded size of the 64-bit header form (adds a trailing reserved word).
    pub const SIZE_64: u32 = 32;

    /// Creates a header for the given magic with zeroed bookkeeping fields.
    #[must_use]
    pub fn new(magic: Magic) -> Self {
        FileHeader {
            magic,
            cpu_type: 0,
            cpu_subtype: 0,
            file_type: FileType::Object,
            ncmds: 0,
            sizeof_cmds: 0,
            flags: HeaderFlags::empty(),
        }
    }

    /// Returns the encoded header size selected by this header's magic.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for the fat magic or any
    /// unrecognized value.
    pub fn size(&self) -> Result<u32> {
        match self.magic.width()? {
            Width::Bits32 => Ok(Self::SIZE_32),
            Width::Bits64 => Ok(Self::SIZE_64),
        }
    }

    /// Serializes the header into `buffer` using the given byte order.
    ///
    /// Returns the number of bytes written ([`FileHeader::SIZE_32`] or
    /// [`FileHeader::SIZE_64`] depending on the magic).
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for a fat or unrecognized magic and
    /// [`crate::Error::OutOfBounds`] if the buffer lacks space.
    pub fn put(&self, buffer: &mut [u8], order: ByteOrder) -> Result<usize> {
        let width = self.magic.width()?;

        let mut offset = 0;
        order.write_at(buffer, &mut offset, self.magic.value())?;
        order.write_at(buffer, &mut offset, self.cpu_type)?;
        order.write_at(buffer, &mut offset, self.cpu_subtype)?;
        order.write_at(buffer, &mut offset, self.file_type as u32)?;
        order.write_at(buffer, &mut offset, self.ncmds)?;
        order.write_at(buffer, &mut offset, self.sizeof_cmds)?;
        order.write_at(buffer, &mut offset, self.flags.bits())?;

        if width == Width::Bits64 {
            order.write_at(buffer, &mut offset, 0u32)?;
        }

        Ok(offset)
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "magic={} cpu={:#x}/{:#x} type={} ncmds={} sizeofcmds={} flags={:?}",
            self.magic,
            self.cpu_type,
            self.cpu_subtype,
            self.file_type,
            self.ncmds,
            self.sizeof_cmds,
            self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::io::read_le_at;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn test_magic_width() {
        assert_eq!(Magic::MAGIC_32.width().unwrap(), Width::Bits32);
        assert_eq!(Magic::MAGIC_64.width().unwrap(), Width::Bits64);
        assert!(matches!(
            Magic::MAGIC_FAT.width(),
            Err(Error::UnsupportedFormat { magic: 0xcafe_babe })
        ));
        assert!(matches!(
            Magic(0xdead_beef).width(),
            Err(Error::UnsupportedFormat { magic: 0xdead_beef })
        ));
    }

    #[test]
    fn test_file_type_values_roundtrip() {
        assert_eq!(FileType::COUNT, 11);
        for t in FileType::iter() {
            assert_eq!(FileType::from_value(t as u32), Some(t));
        }
        assert_eq!(FileType::from_value(0), None);
        assert_eq!(FileType::from_value(0x99), None);
    }

    #[test]
    fn test_header_put_64() {
        let mut header = FileHeader::new(Magic::MAGIC_64);
        header.cpu_type = CPU_TYPE_ARM64;
        header.file_type = FileType::Execute;
        header.ncmds = 3;
        header.sizeof_cmds = 0x200;
        header.flags = HeaderFlags::NOUNDEFS | HeaderFlags::PIE;

        let mut buffer = [0u8; FileHeader::SIZE_64 as usize];
        let written = header
            .put(&mut buffer, ByteOrder::LittleEndian)
            .unwrap();
        assert_eq!(written as u32, FileHeader::SIZE_64);

        let mut offset = 0;
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0xfeed_facf);
        assert_eq!(
            read_le_at::<u32>(&buffer, &mut offset).unwrap(),
            CPU_TYPE_ARM64
        );
        offset += 4; // cpu_subtype
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 2);
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 3);
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0x200);
        assert_eq!(
            read_le_at::<u32>(&buffer, &mut offset).unwrap(),
            0x0020_0001
        );
        // Trailing reserved word
        assert_eq!(read_le_at::<u32>(&buffer, &mut offset).unwrap(), 0);
    }

    #[test]
    fn test_header_put_32_size() {
        let header = FileHeader::new(Magic::MAGIC_32);
        let mut buffer = [0u8; 64];
        let written = header.put(&mut buffer, ByteOrder::LittleEndian).unwrap();
        assert_eq!(written as u32, FileHeader::SIZE_32);
    }

    #[test]
    fn test_header_put_fat_rejected() {
        let header = FileHeader::new(Magic::MAGIC_FAT);
        let mut buffer = [0u8; 64];
        assert!(matches!(
            header.put(&mut buffer, ByteOrder::LittleEndian),
            Err(Error::UnsupportedFormat { .. })
        ));
        // Nothing written before the magic check
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_header_put_big_endian() {
        let header = FileHeader::new(Magic::MAGIC_64);
        let mut buffer = [0u8; FileHeader::SIZE_64 as usize];
        header.put(&mut buffer, ByteOrder::BigEndian).unwrap();
        assert_eq!(&buffer[0..4], &[0xfe, 0xed, 0xfa, 0xcf]);
    }
}
