//! # bethpack
//!
//! Build and extract Bethesda game archives through one format-agnostic [`Archive`] type.
//!
//! Three container families are supported:
//!
//! - TES3 BSA (Morrowind): a flat, uncompressed file table.
//! - TES4 BSA (Oblivion, Fallout 3 / New Vegas / Skyrim LE, Skyrim SE): directories of files,
//!   archive-wide flags and compression.
//! - FO4 BA2 (Fallout 4, general and texture archives): a flat table of chunked files,
//!   compressed per file.
//!
//! ## Key Modules
//!
//! - [`archive`]: the [`Archive`] façade and file insertion.
//! - [`codec`]: format detection and the `ba2` readers and writers for each family.
//! - [`extract`]: parallel extraction.
//! - [`version`]: logical versions and their native tokens.
//! - [`path`]: virtual path handling and glob matching.
//!
//! ## Examples
//!
//! ```no_run
//! use bethpack::{Archive, ArchiveVersion};
//! use std::path::Path;
//!
//! # fn main() -> bethpack::Result<()> {
//! let archive = Archive::new(ArchiveVersion::Sse, true);
//! archive.add_file_bytes("textures/sky/clouds.dds", vec![0u8; 128])?;
//! archive.write(Path::new("Clouds.bsa"))?;
//!
//! let mut read = Archive::open(Path::new("Clouds.bsa"))?;
//! read.unpack(Path::new("out"))?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod path;
pub mod version;

pub use archive::Archive;
pub use codec::FileFormat;
pub use config::{CompressionLevel, Tuning};
pub use error::{Error, ErrorKind, FailureSource, Result};
pub use format::{UnderlyingArchive, UnderlyingFile};
pub use version::{ArchiveVersion, NativeVersion};
