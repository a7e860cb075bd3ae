use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of TOC assembly and serialization. Each variant provides
/// specific context about the failure to enable appropriate error handling by callers.
///
/// # Error Categories
///
/// ## Format Errors
/// - [`Error::UnsupportedFormat`] - A magic value this library cannot represent or emit
///
/// ## Construction Errors
/// - [`Error::StructuralMisuse`] - TOC mutation operations invoked out of order
///
/// ## Serialization Errors
/// - [`Error::BufferTooSmall`] - Destination buffer shorter than the TOC image
/// - [`Error::OutOfBounds`] - A primitive write or read past a buffer end
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::WriteMmapFailed`] - Memory-mapped output creation or access failures
/// - [`Error::WriteFinalizationFailed`] - Output finalization failures
/// - [`Error::JsonError`] - Snapshot serialization failures
#[derive(Error, Debug)]
pub enum Error {
    /// The magic value identifies a format this library cannot represent.
    ///
    /// Multi-architecture ("fat") containers and unrecognized magic values fall in this
    /// category. This is a configuration error rather than malformed input: callers may
    /// legitimately probe format support before committing to it, so every size, alignment,
    /// and serialization query reports it as a result instead of aborting.
    #[error("Unsupported Mach-O magic {magic:#010x}")]
    UnsupportedFormat {
        /// The raw magic value that was rejected
        magic: u32,
    },

    /// A TOC mutation was invoked out of the documented construction order.
    ///
    /// Adding a section requires the most recently added load to be a segment. Violations
    /// indicate a caller sequencing bug, not malformed external data; the TOC state is left
    /// untouched when this is reported.
    #[error("TOC misuse - {0}")]
    StructuralMisuse(String),

    /// The destination buffer is shorter than the serialized TOC image.
    ///
    /// Reported by [`crate::FileToc::put`] before any byte is written.
    #[error("Buffer too small - need {needed} bytes, have {actual}")]
    BufferTooSmall {
        /// Bytes required to hold the full TOC image
        needed: usize,
        /// Bytes available in the supplied buffer
        actual: usize,
    },

    /// An out of bound access was attempted on a byte buffer.
    ///
    /// This is the bounds guard of the primitive read/write layer; it prevents buffer
    /// overruns during serialization.
    #[error("Out of Bound access would have occurred!")]
    OutOfBounds,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during output file operations.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Creating or accessing a memory-mapped output file failed.
    #[error("Mmap write failed - {message}")]
    WriteMmapFailed {
        /// Description of the failed mapping operation
        message: String,
    },

    /// Finalizing a memory-mapped output file failed.
    #[error("Finalization failed - {message}")]
    WriteFinalizationFailed {
        /// Description of the failed finalization step
        message: String,
    },

    /// Serializing a TOC snapshot to JSON failed.
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),
}
