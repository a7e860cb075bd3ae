//! Load commands: the generic opaque variant and the closed [`Load`] sum type.
//!
//! A load command is one directive in the TOC. This library special-cases exactly one
//! kind - the segment, which owns a run of section headers - and treats every other
//! command as an opaque payload that knows its own size and serializes itself behind
//! the universal 8-byte `cmd`/`cmdsize` prefix. The variant set is deliberately closed:
//! the construction and serialization logic in [`crate::FileToc`] dispatches over
//! exactly [`Load::Command`] and [`Load::Segment`].

use std::fmt;

use crate::{file::io::ByteOrder, toc::segment::Segment, Error, Result};

/// Mask marking load commands the dynamic linker is required to understand.
pub const LC_REQ_DYLD: u32 = 0x8000_0000;

/// A load command identifier (`LC_*` value).
///
/// The identifier space is open-ended - later format revisions add new commands - so
/// this is a value wrapper with named constants for the common commands rather than a
/// closed enum. Unknown identifiers are preserved and rendered in hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadCmd(pub u32);

impl LoadCmd {
    /// 32-bit segment command
    pub const SEGMENT: LoadCmd = LoadCmd(0x1);
    /// Symbol table command
    pub const SYMTAB: LoadCmd = LoadCmd(0x2);
    /// Unix thread state command
    pub const UNIXTHREAD: LoadCmd = LoadCmd(0x5);
    /// Dynamic symbol table command
    pub const DYSYMTAB: LoadCmd = LoadCmd(0xb);
    /// Load a dynamic library
    pub const LOAD_DYLIB: LoadCmd = LoadCmd(0xc);
    /// Identify a dynamic library
    pub const ID_DYLIB: LoadCmd = LoadCmd(0xd);
    /// Load the dynamic linker
    pub const LOAD_DYLINKER: LoadCmd = LoadCmd(0xe);
    /// 64-bit segment command
    pub const SEGMENT_64: LoadCmd = LoadCmd(0x19);
    /// Image UUID
    pub const UUID: LoadCmd = LoadCmd(0x1b);
    /// Code signature location
    pub const CODE_SIGNATURE: LoadCmd = LoadCmd(0x1d);
    /// Compressed dyld information, required by dyld
    pub const DYLD_INFO_ONLY: LoadCmd = LoadCmd(0x22 | LC_REQ_DYLD);
    /// Function start addresses
    pub const FUNCTION_STARTS: LoadCmd = LoadCmd(0x26);
    /// Program entry point, required by dyld
    pub const MAIN: LoadCmd = LoadCmd(0x28 | LC_REQ_DYLD);
    /// Table of non-instructions in the text segment
    pub const DATA_IN_CODE: LoadCmd = LoadCmd(0x29);
    /// Source version used to build the image
    pub const SOURCE_VERSION: LoadCmd = LoadCmd(0x2a);
    /// Minimum OS version and build tools
    pub const BUILD_VERSION: LoadCmd = LoadCmd(0x32);
    /// Exports trie location, required by dyld
    pub const DYLD_EXPORTS_TRIE: LoadCmd = LoadCmd(0x33 | LC_REQ_DYLD);
    /// Chained fixups location, required by dyld
    pub const DYLD_CHAINED_FIXUPS: LoadCmd = LoadCmd(0x34 | LC_REQ_DYLD);

    /// Returns the raw identifier value
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Returns the conventional `LC_*` name for known identifiers.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            LoadCmd::SEGMENT => "LC_SEGMENT",
            LoadCmd::SYMTAB => "LC_SYMTAB",
            LoadCmd::UNIXTHREAD => "LC_UNIXTHREAD",
            LoadCmd::DYSYMTAB => "LC_DYSYMTAB",
            LoadCmd::LOAD_DYLIB => "LC_LOAD_DYLIB",
            LoadCmd::ID_DYLIB => "LC_ID_DYLIB",
            LoadCmd::LOAD_DYLINKER => "LC_LOAD_DYLINKER",
            LoadCmd::SEGMENT_64 => "LC_SEGMENT_64",
            LoadCmd::UUID => "LC_UUID",
            LoadCmd::CODE_SIGNATURE => "LC_CODE_SIGNATURE",
            LoadCmd::DYLD_INFO_ONLY => "LC_DYLD_INFO_ONLY",
            LoadCmd::FUNCTION_STARTS => "LC_FUNCTION_STARTS",
            LoadCmd::MAIN => "LC_MAIN",
            LoadCmd::DATA_IN_CODE => "LC_DATA_IN_CODE",
            LoadCmd::SOURCE_VERSION => "LC_SOURCE_VERSION",
            LoadCmd::BUILD_VERSION => "LC_BUILD_VERSION",
            LoadCmd::DYLD_EXPORTS_TRIE => "LC_DYLD_EXPORTS_TRIE",
            LoadCmd::DYLD_CHAINED_FIXUPS => "LC_DYLD_CHAINED_FIXUPS",
            _ => return None,
        })
    }
}

impl fmt::Display for LoadCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "LC_{:#x}", self.0),
        }
    }
}

/// A generic load command whose payload this library does not interpret.
///
/// The payload holds everything after the universal 8-byte `cmd`/`cmdsize` prefix,
/// already encoded by the collaborator that built it. Serialization writes the prefix
/// in the requested byte order and the payload verbatim.
#[derive(Debug, Clone)]
pub struct LoadCommand {
    cmd: LoadCmd,
    payload: Vec<u8>,
}

impl LoadCommand {
    /// Encoded size of the universal `cmd`/`cmdsize` prefix.
    pub const PREFIX_SIZE: u32 = 8;

    /// Creates a generic load command from its identifier and pre-encoded payload.
    #[must_use]
    pub fn new(cmd: LoadCmd, payload: Vec<u8>) -> Self {
        LoadCommand { cmd, payload }
    }

    /// Returns the command identifier.
    #[must_use]
    pub fn cmd(&self) -> LoadCmd {
        self.cmd
    }

    /// Returns the pre-encoded payload (everything after the prefix).
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the encoded size of this command including the prefix.
    #[must_use]
    pub fn load_size(&self) -> u32 {
        Self::PREFIX_SIZE + self.payload.len() as u32
    }

    /// Serializes the command into `buffer`, returning the bytes written.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer lacks space.
    pub fn put(&self, buffer: &mut [u8], order: ByteOrder) -> Result<usize> {
        let mut offset = 0;
        order.write_at(buffer, &mut offset, self.cmd.value())?;
        order.write_at(buffer, &mut offset, self.load_size())?;

        let end = offset + self.payload.len();
        if end > buffer.len() {
            return Err(Error::OutOfBounds);
        }
        buffer[offset..end].copy_from_slice(&self.payload);

        Ok(end)
    }
}

impl fmt::Display for LoadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} payload bytes", self.payload.len())
    }
}

/// One directive in the TOC.
///
/// The variant set is closed: segments get the special construction and serialization
/// treatment described in [`crate::FileToc`], everything else is carried opaquely.
#[derive(Debug, Clone)]
pub enum Load {
    /// A generic command with an uninterpreted payload
    Command(LoadCommand),
    /// A segment owning a contiguous run of the shared section table
    Segment(Segment),
}

impl Load {
    /// Returns the command identifier of this load.
    #[must_use]
    pub fn cmd(&self) -> LoadCmd {
        match self {
            Load::Command(c) => c.cmd(),
            Load::Segment(s) => s.cmd(),
        }
    }

    /// Returns the encoded size of this load.
    ///
    /// A segment's size already folds in the section headers it owns.
    #[must_use]
    pub fn load_size(&self) -> u32 {
        match self {
            Load::Command(c) => c.load_size(),
            Load::Segment(s) => s.load_size(),
        }
    }

    /// Returns the segment if this load is one.
    #[must_use]
    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Load::Segment(s) => Some(s),
            Load::Command(_) => None,
        }
    }
}

impl From<LoadCommand> for Load {
    fn from(cmd: LoadCommand) -> Self {
        Load::Command(cmd)
    }
}

impl From<Segment> for Load {
    fn from(seg: Segment) -> Self {
        Load::Segment(seg)
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Load::Command(c) => fmt::Display::fmt(c, f),
            Load::Segment(s) => fmt::Display::fmt(s, f),
        }
    }
}
