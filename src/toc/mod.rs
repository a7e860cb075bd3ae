//! TOC assembly and serialization.
//!
//! This module provides [`FileToc`], the orchestrator that owns the file header, the
//! byte order, the ordered load list, and the flat shared section table, and that
//! computes sizes, enforces the structural invariants, and emits the byte-exact image
//! of the header-and-commands region of a Mach-O file.
//!
//! # Architecture
//!
//! Construction is incremental and ordered: loads (and segments) are appended one at a
//! time, and a segment's sections must all be added before the next load. The
//! orchestrator maintains these invariants across every mutation:
//!
//! 1. `header.ncmds` equals the number of loads
//! 2. `header.sizeof_cmds` equals the summed encoded size of all loads, where a
//!    segment's size folds in the section headers it owns
//! 3. Each segment's `(firstsect, nsect)` range covers exactly the sections appended
//!    while it was the most recent load, and the ranges of all segments tile the
//!    shared section table in append order
//! 4. Structure widths (32- vs 64-bit) are derived from the container magic alone
//!
//! Once built, a TOC is conceptually frozen: the sizing queries, [`FileToc::put`],
//! the [`std::fmt::Display`] rendering, and [`FileToc::snapshot`] are pure reads.
//!
//! # Key Components
//!
//! - [`FileToc`] - The orchestrator
//! - [`header::FileHeader`], [`header::Magic`] - Header value type and width selector
//! - [`load::Load`], [`load::LoadCommand`] - The closed load variant set
//! - [`segment::Segment`], [`section::Section`] - The structured segment hierarchy
//! - [`snapshot::TocSnapshot`] - Serializable structured export
//!
//! # Thread Safety
//!
//! [`FileToc`] is a single mutable aggregate with no interior locking. Construction is
//! single-writer; after construction, the read operations are safe to call from
//! multiple readers provided no writer is active.

use std::fmt;
use std::path::Path;

use tracing::{debug, trace};

use crate::{
    file::{io::ByteOrder, output::Output},
    Error, Result,
};

pub mod header;
pub mod load;
pub mod section;
pub mod segment;
pub mod snapshot;

pub use header::{FileHeader, FileType, HeaderFlags, Magic, Width};
pub use load::{Load, LoadCmd, LoadCommand};
pub use section::Section;
pub use segment::{Segment, SegmentFlags, VmProt};
pub use snapshot::{HeaderSnapshot, LoadSnapshot, SectionSnapshot, TocSnapshot};

use header::Width::{Bits32, Bits64};

/// Encoded size of one 32-bit symbol table entry (`nlist`).
pub const NLIST_SIZE_32: u32 = 12;
/// Encoded size of one 64-bit symbol table entry (`nlist_64`).
pub const NLIST_SIZE_64: u32 = 16;

/// A function entity derived from symbol and unwind data by external collaborators.
///
/// [`FileToc`] carries these only as an opaque cache: every mutation invalidates it,
/// and no TOC operation consults it.
#[derive(Debug, Clone)]
pub struct Function {
    /// Symbol name
    pub name: String,
    /// Starting address
    pub addr: u64,
    /// Size in bytes
    pub size: u64,
}

/// The table of contents of a Mach-O file: header plus ordered load commands.
///
/// Insertion order is on-disk order, for loads and for sections alike. Sections live
/// in one flat shared table; each segment references its contiguous run of that table
/// by start index and count and never holds a private copy.
#[derive(Debug, Clone)]
pub struct FileToc {
    /// The file header, owned by value; bookkeeping fields are maintained here
    pub header: FileHeader,
    /// Byte order used for every multi-byte field written
    pub byte_order: ByteOrder,

    loads: Vec<Load>,
    sections: Vec<Section>,
    functions: Option<Vec<Function>>,
}

impl FileToc {
    /// Creates an empty TOC for the given magic and byte order.
    #[must_use]
    pub fn new(magic: Magic, byte_order: ByteOrder) -> Self {
        FileToc {
            header: FileHeader::new(magic),
            byte_order,
            loads: Vec::new(),
            sections: Vec::new(),
            functions: None,
        }
    }

    /// Returns the loads in on-disk order.
    #[must_use]
    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    /// Returns the shared section table in on-disk order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the run of the shared section table owned by `seg`.
    ///
    /// The segment must belong to this TOC; the range is the one maintained by
    /// [`FileToc::add_section`].
    #[must_use]
    pub fn segment_sections(&self, seg: &Segment) -> &[Section] {
        let first = seg.firstsect() as usize;
        let count = seg.nsect() as usize;
        &self.sections[first..first + count]
    }

    /// Appends a load to the TOC.
    ///
    /// Updates the header's command count and size bookkeeping. The load's internal
    /// consistency is not validated.
    pub fn add_load(&mut self, load: impl Into<Load>) {
        let load = load.into();
        self.functions = None;
        self.header.ncmds += 1;
        self.header.sizeof_cmds += load.load_size();
        self.loads.push(load);
    }

    /// Appends a segment to the TOC.
    ///
    /// The segment's section bookkeeping is reset: sections are attached afterwards
    /// with [`FileToc::add_section`], and only to the most recently added segment.
    pub fn add_segment(&mut self, mut seg: Segment) {
        seg.nsect = 0;
        seg.firstsect = 0;
        self.add_load(Load::Segment(seg));
    }

    /// Appends a section to the most recently added segment.
    ///
    /// The first section added to a segment records the segment's start index into the
    /// shared table; every addition grows the segment's owned run, its encoded size,
    /// and the header's size bookkeeping by the width-appropriate section header size.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralMisuse`] when no load has been added yet or
    /// the most recent load is not a segment; the TOC is left unmodified.
    pub fn add_section(&mut self, sec: Section) -> Result<()> {
        let next_index = self.sections.len() as u32;
        let seg = match self.loads.last_mut() {
            Some(Load::Segment(seg)) => seg,
            Some(other) => {
                return Err(Error::StructuralMisuse(format!(
                    "cannot add section {}: most recent load is {}, not a segment",
                    sec.name,
                    other.cmd()
                )))
            }
            None => {
                return Err(Error::StructuralMisuse(format!(
                    "cannot add section {}: no load commands have been added",
                    sec.name
                )))
            }
        };

        if seg.nsect == 0 {
            seg.firstsect = next_index;
        }
        seg.nsect += 1;

        let section_size = seg.section_header_size();
        seg.len += section_size;
        self.header.sizeof_cmds += section_size;

        self.sections.push(sec);
        self.functions = None;
        Ok(())
    }

    /// Returns the function cache, if a collaborator has populated it.
    #[must_use]
    pub fn functions(&self) -> Option<&[Function]> {
        self.functions.as_deref()
    }

    /// Populates the function cache.
    ///
    /// The cache is derived from symbol and unwind data outside this library and is
    /// dropped by every mutation of the load or section lists.
    pub fn set_functions(&mut self, functions: Vec<Function>) {
        self.functions = Some(functions);
    }

    /// Returns the encoded header size selected by the TOC's magic.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for a fat or unrecognized magic.
    pub fn hdr_size(&self) -> Result<u32> {
        self.header.size()
    }

    /// Returns the summed encoded size of all load commands.
    ///
    /// Section headers are included through their owning segment's size; segment and
    /// section payload data is not.
    #[must_use]
    pub fn load_size(&self) -> u32 {
        self.loads.iter().map(Load::load_size).sum()
    }

    /// Returns the total size of the TOC image: header plus all load commands.
    ///
    /// This is the minimum buffer length [`FileToc::put`] accepts.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for a fat or unrecognized magic.
    pub fn toc_size(&self) -> Result<u32> {
        Ok(self.hdr_size()? + self.load_size())
    }

    /// Returns the minimum file length implied by the TOC.
    ///
    /// The floor is [`FileToc::load_size`] - the commands are expected to live inside
    /// the text segment - extended by every segment's declared `fileoff + filesz`.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        let mut size = u64::from(self.load_size());
        for load in &self.loads {
            if let Load::Segment(seg) = load {
                let end = seg.fileoff + seg.filesz;
                if end > size {
                    size = end;
                }
            }
        }
        size
    }

    /// Returns the required placement alignment for load commands: 8 for a 64-bit
    /// container, 4 otherwise.
    #[must_use]
    pub fn load_align(&self) -> u64 {
        if self.header.magic.is_64bit() {
            8
        } else {
            4
        }
    }

    /// Returns the encoded size of one symbol table entry for this container width.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for a fat or unrecognized magic.
    pub fn symbol_size(&self) -> Result<u32> {
        match self.header.magic.width()? {
            Bits32 => Ok(NLIST_SIZE_32),
            Bits64 => Ok(NLIST_SIZE_64),
        }
    }

    /// Serializes the header and all load commands into `buffer`.
    ///
    /// Segments are written in the width selected by the TOC's magic, each followed
    /// immediately by its owned section headers from the shared table; other loads
    /// serialize themselves. Returns the total bytes written, which equals
    /// [`FileToc::toc_size`] whenever the structural invariants hold. Section and
    /// segment payload data is never written.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFormat`] for a fat or unrecognized magic and
    /// [`crate::Error::BufferTooSmall`] - before any byte is written - if the buffer
    /// is shorter than the TOC image.
    pub fn put(&self, buffer: &mut [u8]) -> Result<usize> {
        let needed = self.toc_size()? as usize;
        if buffer.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: buffer.len(),
            });
        }

        let width = self.header.magic.width()?;
        debug!(
            ncmds = self.header.ncmds,
            sizeof_cmds = self.header.sizeof_cmds,
            needed,
            "writing TOC image"
        );

        let mut next = self.header.put(buffer, self.byte_order)?;
        for load in &self.loads {
            trace!(cmd = %load.cmd(), size = load.load_size(), "writing load command");
            match load {
                Load::Segment(seg) => match width {
                    Bits64 => {
                        next += seg.put64(&mut buffer[next..], self.byte_order)?;
                        for sec in self.segment_sections(seg) {
                            next += sec.put64(&mut buffer[next..], self.byte_order)?;
                        }
                    }
                    Bits32 => {
                        next += seg.put32(&mut buffer[next..], self.byte_order)?;
                        for sec in self.segment_sections(seg) {
                            next += sec.put32(&mut buffer[next..], self.byte_order)?;
                        }
                    }
                },
                Load::Command(cmd) => {
                    next += cmd.put(&mut buffer[next..], self.byte_order)?;
                }
            }
        }

        Ok(next)
    }

    /// Emits the TOC image to a file at `path`.
    ///
    /// The file is sized to the larger of [`FileToc::toc_size`] and
    /// [`FileToc::file_size`], the TOC image fills its prefix, and the remainder is
    /// zero. The file is removed again if any step fails.
    ///
    /// # Errors
    /// Returns the errors of [`FileToc::put`] plus
    /// [`crate::Error::WriteMmapFailed`]/[`crate::Error::WriteFinalizationFailed`]
    /// from the output path.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toc_size = u64::from(self.toc_size()?);
        let file_size = self.file_size().max(toc_size);

        let mut output = Output::create(path, file_size)?;
        let written = self.put(output.as_mut_slice())?;
        debug!(written, file_size, "TOC image emitted to file");
        output.finalize()
    }

    /// Produces a new, independently mutable TOC derived from this one.
    ///
    /// The copy shares the header's static identity (magic, CPU fields) and the byte
    /// order, carries the supplied file type and flags, and starts with zeroed command
    /// bookkeeping and empty load/section lists. Mutating the copy never affects this
    /// TOC.
    #[must_use]
    pub fn derived_copy(&self, file_type: FileType, flags: HeaderFlags) -> FileToc {
        let mut header = self.header;
        header.ncmds = 0;
        header.sizeof_cmds = 0;
        header.file_type = file_type;
        header.flags = flags;

        FileToc {
            header,
            byte_order: self.byte_order,
            loads: Vec::new(),
            sections: Vec::new(),
            functions: None,
        }
    }

    /// Builds a structured snapshot of the TOC for external tooling.
    ///
    /// The snapshot carries every field [`FileToc::put`] would write, including
    /// generic command payloads, and omits section payload data and the function
    /// cache.
    #[must_use]
    pub fn snapshot(&self) -> TocSnapshot {
        let loads = self
            .loads
            .iter()
            .map(|load| match load {
                Load::Command(cmd) => LoadSnapshot::Command {
                    cmd: cmd.cmd().value(),
                    name: cmd.cmd().to_string(),
                    payload: cmd.payload().to_vec(),
                },
                Load::Segment(seg) => LoadSnapshot::Segment {
                    cmd: seg.cmd().value(),
                    name: seg.name.clone(),
                    vmaddr: seg.vmaddr,
                    vmsize: seg.vmsize,
                    fileoff: seg.fileoff,
                    filesz: seg.filesz,
                    maxprot: seg.maxprot.bits(),
                    initprot: seg.initprot.bits(),
                    flags: seg.flags.bits(),
                    sections: self
                        .segment_sections(seg)
                        .iter()
                        .map(|sec| SectionSnapshot {
                            name: sec.name.clone(),
                            seg_name: sec.seg_name.clone(),
                            addr: sec.addr,
                            size: sec.size,
                            offset: sec.offset,
                            align: sec.align,
                            reloff: sec.reloff,
                            nreloc: sec.nreloc,
                            flags: sec.flags,
                        })
                        .collect(),
                },
            })
            .collect();

        TocSnapshot {
            header: HeaderSnapshot {
                magic: self.header.magic.value(),
                cpu_type: self.header.cpu_type,
                cpu_subtype: self.header.cpu_subtype,
                file_type: self.header.file_type.to_string(),
                ncmds: self.header.ncmds,
                sizeof_cmds: self.header.sizeof_cmds,
                flags: self.header.flags.bits(),
            },
            byte_order: self.byte_order.name(),
            loads,
        }
    }
}

impl fmt::Display for FileToc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for (i, load) in self.loads.iter().enumerate() {
            match load {
                Load::Segment(seg) => {
                    writeln!(f, "{i:03}: {seg}")?;
                    for sec in self.segment_sections(seg) {
                        writeln!(f, "{sec}")?;
                    }
                }
                Load::Command(cmd) => {
                    writeln!(f, "{i:03}: {:<28}{cmd}", cmd.cmd().to_string())?;
                }
            }
        }
        Ok(())
    }
}
