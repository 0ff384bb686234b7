//! # Format Variants
//!
//! An [`crate::Archive`] holds exactly one of three in-memory representations, and accepts only
//! file objects built for that same representation. Both sides are closed sum types tagged by
//! [`FileFormat`]; every operation on them is an exhaustive `match`.

use crate::codec::{fo4, tes3, tes4, FileFormat};
use crate::config::Tuning;
use crate::version::ArchiveVersion;

/// The representation held by an archive.
///
/// TES4 archives keep their archive-wide options (flags and content types) next to the
/// directory map. The version inside those options is replaced by the archive's resolved
/// version on every write.
#[derive(Debug, Clone)]
pub enum UnderlyingArchive {
    Tes3(tes3::Archive<'static>),
    Tes4(tes4::Archive<'static>, tes4::ArchiveOptions),
    Fo4(fo4::Archive<'static>),
}

impl Default for UnderlyingArchive {
    fn default() -> Self {
        UnderlyingArchive::Tes3(tes3::Archive::new())
    }
}

impl UnderlyingArchive {
    /// Creates an empty representation for `version`.
    ///
    /// TES4 archives always store directory and file name tables; requesting compression sets
    /// the archive-wide compressed flag. The other two families carry compression per file.
    pub fn new(version: ArchiveVersion, compressed: bool) -> Self {
        Self::with_tuning(version, compressed, &Tuning::default())
    }

    pub(crate) fn with_tuning(version: ArchiveVersion, compressed: bool, tuning: &Tuning) -> Self {
        match version.format() {
            FileFormat::Tes3 => UnderlyingArchive::Tes3(tes3::Archive::new()),
            FileFormat::Tes4 => {
                let mut flags =
                    tes4::ArchiveFlags::DIRECTORY_STRINGS | tes4::ArchiveFlags::FILE_STRINGS;
                if compressed {
                    flags |= tes4::ArchiveFlags::COMPRESSED;
                }
                if tuning.embed_file_names && version >= ArchiveVersion::Fo3 {
                    flags |= tes4::ArchiveFlags::EMBEDDED_FILE_NAMES;
                }
                let options = tes4::ArchiveOptions::builder().flags(flags).build();
                UnderlyingArchive::Tes4(tes4::Archive::new(), options)
            }
            FileFormat::Fo4 => UnderlyingArchive::Fo4(fo4::Archive::new()),
        }
    }

    pub fn tag(&self) -> FileFormat {
        match self {
            UnderlyingArchive::Tes3(_) => FileFormat::Tes3,
            UnderlyingArchive::Tes4(..) => FileFormat::Tes4,
            UnderlyingArchive::Fo4(_) => FileFormat::Fo4,
        }
    }

    /// `"tes3"`, `"tes4"` or `"fo4"`.
    pub fn identifier(&self) -> &'static str {
        self.tag().name()
    }

    /// Number of top-level entries: files for TES3 and FO4, directories for TES4.
    pub fn len(&self) -> usize {
        match self {
            UnderlyingArchive::Tes3(a) => a.len(),
            UnderlyingArchive::Tes4(a, _) => a.len(),
            UnderlyingArchive::Fo4(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of files, across all directories for TES4.
    pub fn file_count(&self) -> usize {
        match self {
            UnderlyingArchive::Tes3(a) => a.len(),
            UnderlyingArchive::Tes4(a, _) => a.values().map(|directory| directory.len()).sum(),
            UnderlyingArchive::Fo4(a) => a.len(),
        }
    }
}

/// A file object built for one representation.
#[derive(Debug, Clone)]
pub enum UnderlyingFile {
    Tes3(tes3::File<'static>),
    Tes4(tes4::File<'static>),
    Fo4(fo4::File<'static>),
}

impl UnderlyingFile {
    pub fn tag(&self) -> FileFormat {
        match self {
            UnderlyingFile::Tes3(_) => FileFormat::Tes3,
            UnderlyingFile::Tes4(_) => FileFormat::Tes4,
            UnderlyingFile::Fo4(_) => FileFormat::Fo4,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.tag().name()
    }
}

impl From<tes3::File<'static>> for UnderlyingFile {
    fn from(file: tes3::File<'static>) -> Self {
        UnderlyingFile::Tes3(file)
    }
}

impl From<tes4::File<'static>> for UnderlyingFile {
    fn from(file: tes4::File<'static>) -> Self {
        UnderlyingFile::Tes4(file)
    }
}

impl From<fo4::File<'static>> for UnderlyingFile {
    fn from(file: fo4::File<'static>) -> Self {
        UnderlyingFile::Fo4(file)
    }
}
