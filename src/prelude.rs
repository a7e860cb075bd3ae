//! # machoscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! machoscope library. Import this module to get quick access to the essential types
//! for TOC assembly and serialization.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all machoscope operations
pub use crate::Error;

/// The result type used throughout machoscope
pub use crate::Result;

// ================================================================================================
// Main Entry Point
// ================================================================================================

/// The TOC orchestrator
pub use crate::toc::FileToc;

// ================================================================================================
// Header Types
// ================================================================================================

/// Header value type and its discriminators
pub use crate::toc::{FileHeader, FileType, HeaderFlags, Magic, Width};

/// Endianness selector for all serialization
pub use crate::file::io::ByteOrder;

// ================================================================================================
// Loads, Segments, and Sections
// ================================================================================================

/// The closed load variant set and the command identifier type
pub use crate::toc::{Load, LoadCmd, LoadCommand};

/// The structured segment hierarchy
pub use crate::toc::{Section, Segment, SegmentFlags, VmProt};

// ================================================================================================
// Structured Export
// ================================================================================================

/// Serializable snapshot types for external tooling
pub use crate::toc::{HeaderSnapshot, LoadSnapshot, SectionSnapshot, TocSnapshot};
