//! # Container Codecs
//!
//! The byte layouts of the three Bethesda container families come from the [`ba2`] crate:
//!
//! - [`tes3`]: the flat Morrowind BSA, uncompressed, one level of keys.
//! - [`tes4`]: the hierarchical BSA (versions 103/104/105), directory → file keys, archive-wide
//!   flags, zlib or LZ4 compression.
//! - [`fo4`]: the BA2 container, flat keys, chunked files compressed per chunk. Texture archives
//!   store DDS files split by mip level.
//!
//! This module adds what the façade needs around them: format detection reported through this
//! crate's [`Error`], the mapping of codec failures onto it, and atomic archive writes. Archive
//! writes go through a temporary file in the destination directory which is only renamed over the
//! target once it is complete, so a failed write never leaves a truncated archive behind.

pub use ba2::{fo4, tes3, tes4};

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// The version number a TES3 archive starts with.
pub const TES3_VERSION: u32 = 0x100;

/// The container family of an archive on disk.
///
/// Doubles as the tag of the in-memory representation an archive holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Tes3,
    Tes4,
    Fo4,
}

impl FileFormat {
    /// Short identifier used in log lines and error messages.
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Tes3 => "tes3",
            FileFormat::Tes4 => "tes4",
            FileFormat::Fo4 => "fo4",
        }
    }
}

impl From<ba2::FileFormat> for FileFormat {
    fn from(format: ba2::FileFormat) -> Self {
        match format {
            ba2::FileFormat::TES3 => FileFormat::Tes3,
            ba2::FileFormat::TES4 => FileFormat::Tes4,
            ba2::FileFormat::FO4 => FileFormat::Fo4,
        }
    }
}

/// The options every FO4 archive of `format` is written with: version 1, zlib, name table.
pub fn fo4_archive_options(format: fo4::Format) -> fo4::ArchiveOptions {
    fo4::ArchiveOptions::builder()
        .format(format)
        .version(fo4::Version::v1)
        .compression_format(fo4::CompressionFormat::Zip)
        .strings(true)
        .build()
}

/// Probes the file at `path` and classifies it into one of the three families.
///
/// Files too short to carry a magic number are unrecognized, not unreadable.
pub fn guess_format(path: &Path) -> Result<FileFormat> {
    let mut file = File::open(path).map_err(|e| Error::read(e, path))?;
    ba2::guess_format(&mut file)
        .map(FileFormat::from)
        .ok_or_else(|| Error::FormatUnrecognized {
            path: path.to_path_buf(),
        })
}

/// A failure reported by one of the codecs.
pub(crate) trait CodecError: Display + Sized {
    /// Splits off the I/O failure, if that is what this is.
    fn into_io(self) -> std::result::Result<io::Error, Self>;
}

macro_rules! codec_error {
    ($($codec:ident),+) => {
        $(
            impl CodecError for $codec::Error {
                fn into_io(self) -> std::result::Result<io::Error, Self> {
                    match self {
                        $codec::Error::Io(e) => Ok(e),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

codec_error!(tes3, tes4, fo4);

/// Maps a codec failure while reading `path`.
///
/// Running out of bytes means the archive is truncated, which is corrupt data rather than a
/// failing disk.
pub(crate) fn read_failure<E: CodecError>(path: &Path) -> impl FnOnce(E) -> Error + '_ {
    move |e| match e.into_io() {
        Ok(io)
            if matches!(
                io.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            Error::InvalidData(format!("'{}': {}", path.display(), io))
        }
        Ok(io) => Error::read(io, path),
        Err(e) => Error::InvalidData(format!("'{}': {}", path.display(), e)),
    }
}

/// Maps a codec failure while writing `path`.
pub(crate) fn write_failure<E: CodecError>(path: &Path) -> impl FnOnce(E) -> Error + '_ {
    move |e| match e.into_io() {
        Ok(io) => Error::write(io, path),
        Err(e) => Error::InvalidData(format!("'{}': {}", path.display(), e)),
    }
}

/// Maps a codec failure while building an entry from the bytes of `source`.
pub(crate) fn build_failure<E: CodecError>(source: &Path) -> impl FnOnce(E) -> Error + '_ {
    move |e| match e.into_io() {
        Ok(io) => Error::read(io, source),
        Err(e) => Error::InvalidData(format!("'{}': {}", source.display(), e)),
    }
}

/// Streams an archive into a temporary sibling of `path`, then renames it into place.
pub(crate) fn write_atomically(
    path: &Path,
    body: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::write(e, path))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        body(&mut writer)?;
        writer.flush().map_err(|e| Error::write(e, path))?;
    }
    tmp.persist(path).map_err(|e| Error::write(e.error, path))?;
    Ok(())
}

/// Writes an extracted payload to a loose file.
pub(crate) fn write_loose(path: &Path, body: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::write(e, path))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer)?;
    writer.flush().map_err(|e| Error::write(e, path))
}
