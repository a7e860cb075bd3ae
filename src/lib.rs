#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # machoscope
//!
//! A cross-platform library for assembling and emitting the table of contents (TOC) of
//! Mach-O executables: the ordered collection of load commands, the segment/section
//! hierarchy they describe, and the byte-exact serialization of the header-and-commands
//! region of the file.
//!
//! ## Features
//!
//! - **Byte-exact output** - Every multi-byte field is written through an explicit
//!   [`ByteOrder`], producing identical images on every host platform
//! - **Both container widths** - 32-bit and 64-bit Mach-O layouts, selected by the
//!   header magic; mixed widths within one TOC are rejected by construction
//! - **Structural invariants** - Command counts, command sizes, and the segment/section
//!   tiling of the shared section table are maintained by the mutation operations
//! - **Typed errors** - Unsupported formats, construction misuse, and short buffers all
//!   surface as [`Error`] values instead of aborting
//! - **Memory safe** - No out-of-bounds writes; every serialization path is bounds-checked
//!
//! ## Quick Start
//!
//! ```rust
//! use machoscope::prelude::*;
//!
//! let mut toc = FileToc::new(Magic::MAGIC_64, ByteOrder::LittleEndian);
//! toc.header.file_type = FileType::Execute;
//!
//! let mut text = Segment::new("__TEXT", Magic::MAGIC_64)?;
//! text.vmaddr = 0x1_0000_0000;
//! toc.add_segment(text);
//! toc.add_section(Section::new("__text", "__TEXT"))?;
//!
//! let mut image = vec![0u8; toc.toc_size()? as usize];
//! let written = toc.put(&mut image)?;
//! assert_eq!(written as u32, toc.toc_size()?);
//! # Ok::<(), machoscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `machoscope` is organized into these modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`toc`] - The [`FileToc`] orchestrator, header, load command, segment, and section types
//! - [`file`] - Endian-aware buffer primitives and the memory-mapped output path
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! Parsing existing binaries into this model, interpreting the contents of non-segment
//! load commands, and multi-architecture ("fat") containers are out of scope; collaborators
//! hand this library already-built [`toc::Load`] and [`toc::Section`] values and receive a
//! filled byte buffer back.

pub(crate) mod error;
pub mod file;
pub mod prelude;
pub mod toc;

/// A type alias for `Result<T, machoscope::Error>`
///
/// This simplifies function signatures throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type of all fallible operations in this library.
pub use error::Error;

/// Endianness selector used for every multi-byte field written or read.
pub use file::io::ByteOrder;

/// The TOC orchestrator: owns the header, byte order, load list, and shared section table.
pub use toc::FileToc;
