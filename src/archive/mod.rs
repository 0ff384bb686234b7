//! # Archive
//!
//! The format-agnostic façade. An [`Archive`] owns one [`UnderlyingArchive`], the logical
//! [`ArchiveVersion`] it was created or read as, and the compression policy applied to new
//! entries.
//!
//! Insertion takes `&self` and serializes mutation through an internal mutex, so several threads
//! may add files to the same archive at once. Extraction takes `&mut self`: it reads the
//! representation without locking, and the borrow checker guarantees no insertion is running.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ba2::prelude::*;
use ba2::{CompressionResult, Copied};
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::codec::{self, fo4, tes3, tes4, FileFormat};
use crate::config::Tuning;
use crate::error::{Error, Result};
use crate::extract;
use crate::format::{UnderlyingArchive, UnderlyingFile};
use crate::path::{normalize_virtual, split_virtual};
use crate::version::{self, ArchiveVersion, NativeVersion};

/// A game archive of any supported family.
#[derive(Debug)]
pub struct Archive {
    version: ArchiveVersion,
    compressed: bool,
    tuning: Tuning,
    archive: Mutex<UnderlyingArchive>,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(ArchiveVersion::default(), false)
    }
}

impl Archive {
    /// Creates an empty archive of `version`.
    ///
    /// `compressed` sets the archive-wide flag for TES4 archives and makes every file inserted
    /// into an FO4 archive compressed. TES3 archives ignore it.
    pub fn new(version: ArchiveVersion, compressed: bool) -> Self {
        Self::with_tuning(version, compressed, Tuning::default())
    }

    pub fn with_tuning(version: ArchiveVersion, compressed: bool, tuning: Tuning) -> Self {
        let archive = UnderlyingArchive::with_tuning(version, compressed, &tuning);
        Self {
            version,
            compressed,
            tuning,
            archive: Mutex::new(archive),
        }
    }

    /// Opens the archive at `path`, detecting its family.
    pub fn open(path: &Path) -> Result<Self> {
        let mut archive = Self::default();
        archive.read(path)?;
        Ok(archive)
    }

    /// Replaces the contents of this archive with the archive at `path`.
    ///
    /// On failure the archive is reset to an empty default TES3 archive; nothing partially
    /// parsed is kept.
    pub fn read(&mut self, path: &Path) -> Result<ArchiveVersion> {
        match self.read_inner(path) {
            Ok(version) => Ok(version),
            Err(e) => {
                let tuning = std::mem::take(&mut self.tuning);
                *self = Self::with_tuning(ArchiveVersion::default(), false, tuning);
                Err(e)
            }
        }
    }

    fn read_inner(&mut self, path: &Path) -> Result<ArchiveVersion> {
        let format = codec::guess_format(path)?;
        debug!(path = %path.display(), format = format.name(), "detected archive format");

        let (archive, version, compressed) = match format {
            FileFormat::Tes3 => {
                let a = tes3::Archive::read(path).map_err(codec::read_failure(path))?;
                (UnderlyingArchive::Tes3(a), ArchiveVersion::Tes3, false)
            }
            FileFormat::Tes4 => {
                let (a, options) = tes4::Archive::read(path).map_err(codec::read_failure(path))?;
                let version = logical_version(options.version(), path)?;
                let compressed = options.flags().compressed();
                (UnderlyingArchive::Tes4(a, options), version, compressed)
            }
            FileFormat::Fo4 => {
                let (a, options) = fo4::Archive::read(path).map_err(codec::read_failure(path))?;
                if matches!(options.version(), fo4::Version::v2 | fo4::Version::v3) {
                    return Err(Error::InvalidData(format!(
                        "'{}': unsupported ba2 version {:?}",
                        path.display(),
                        options.version()
                    )));
                }
                let version = logical_version(options.format(), path)?;
                let compressed = a
                    .values()
                    .flat_map(|file| file.iter())
                    .any(|chunk| chunk.is_compressed());
                (UnderlyingArchive::Fo4(a), version, compressed)
            }
        };

        self.version = version;
        self.compressed = compressed;
        *self.archive.get_mut().unwrap_or_else(PoisonError::into_inner) = archive;

        info!(
            path = %path.display(),
            version = version.name(),
            entries = self.file_count(),
            "read archive"
        );
        Ok(version)
    }

    /// Writes the archive to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let archive = self.lock();
        match &*archive {
            UnderlyingArchive::Tes3(a) => codec::write_atomically(path, |out| {
                a.write(out).map_err(codec::write_failure(path))
            })?,
            UnderlyingArchive::Tes4(a, options) => {
                let options = tes4::ArchiveOptions::builder()
                    .flags(options.flags())
                    .types(options.types())
                    .version(version::resolve(self.version, &archive)?)
                    .build();
                codec::write_atomically(path, |out| {
                    a.write(out, &options).map_err(codec::write_failure(path))
                })?
            }
            UnderlyingArchive::Fo4(a) => {
                let options = codec::fo4_archive_options(version::resolve(self.version, &archive)?);
                codec::write_atomically(path, |out| {
                    a.write(out, &options).map_err(codec::write_failure(path))
                })?
            }
        }
        info!(
            path = %path.display(),
            version = self.version.name(),
            entries = archive.len(),
            "wrote archive"
        );
        Ok(())
    }

    /// Adds the file at `path`, keyed by its path relative to `root`.
    pub fn add_file(&self, root: &Path, path: &Path) -> Result<()> {
        let relative = path.strip_prefix(root).map_err(|_| Error::StripPrefix {
            prefix: root.to_path_buf(),
            path: path.to_path_buf(),
        })?;
        let data = fs::read(path).map_err(|e| Error::read(e, path))?;
        let file = self.build_file(data, path)?;
        self.insert_file(relative, file)
    }

    /// Adds `data` under the virtual path `relative`.
    pub fn add_file_bytes(&self, relative: impl AsRef<Path>, data: Vec<u8>) -> Result<()> {
        let file = self.build_file(data, relative.as_ref())?;
        self.insert_file(relative, file)
    }

    /// Places a prebuilt file object under the virtual path `relative`, replacing any entry
    /// already stored there.
    ///
    /// Fails with [`Error::TypeMismatch`] if `file` was built for another family; the archive
    /// is left unchanged.
    pub fn insert_file(&self, relative: impl AsRef<Path>, file: UnderlyingFile) -> Result<()> {
        let key = normalize_virtual(relative.as_ref());
        if key.is_empty() {
            return Err(Error::InvalidData(format!(
                "'{}' does not name a file",
                relative.as_ref().display()
            )));
        }

        let mut archive = self.lock();
        match (&mut *archive, file) {
            (UnderlyingArchive::Tes3(a), UnderlyingFile::Tes3(f)) => {
                a.insert(key.as_str(), f);
            }
            (UnderlyingArchive::Tes4(a, _), UnderlyingFile::Tes4(f)) => {
                let (directory, name) = split_virtual(&key);
                let directory = tes4::ArchiveKey::from(directory);
                if let Some(existing) = a.get_mut(&directory) {
                    existing.insert(name, f);
                } else {
                    let mut created = tes4::Directory::new();
                    created.insert(name, f);
                    a.insert(directory, created);
                }
            }
            (UnderlyingArchive::Fo4(a), UnderlyingFile::Fo4(f)) => {
                a.insert(key.as_str(), f);
            }
            (archive, file) => {
                return Err(Error::TypeMismatch {
                    archive: archive.identifier(),
                    file: file.identifier(),
                })
            }
        }
        debug!(key = %key, "inserted file");
        Ok(())
    }

    /// Adds every regular file below `root`, in parallel. Returns the number of files added.
    pub fn add_dir(&self, root: &Path) -> Result<usize> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        files
            .par_iter()
            .try_for_each(|path: &PathBuf| self.add_file(root, path))?;

        info!(root = %root.display(), files = files.len(), "added directory");
        Ok(files.len())
    }

    /// Extracts every entry under `out_dir`.
    pub fn unpack(&mut self, out_dir: &Path) -> Result<()> {
        self.unpack_matching(out_dir, None).map(|_| ())
    }

    /// Extracts the entries whose virtual path matches `pattern` (a case-insensitive glob, see
    /// [`crate::path::str_match`]). Returns the number of files written.
    pub fn unpack_matching(&mut self, out_dir: &Path, pattern: Option<&str>) -> Result<usize> {
        let version = self.version;
        let archive = self.archive.get_mut().unwrap_or_else(PoisonError::into_inner);
        extract::unpack(archive, version, out_dir, pattern)
    }

    /// Number of top-level entries: files for TES3 and FO4, directories for TES4.
    pub fn file_count(&self) -> usize {
        self.lock().len()
    }

    pub fn version(&self) -> ArchiveVersion {
        self.version
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// The family of the held representation.
    pub fn format(&self) -> FileFormat {
        self.lock().tag()
    }

    /// Resolves the archive's version into the codec token `T`.
    pub fn resolve<T: NativeVersion>(&self) -> Result<T> {
        version::resolve(self.version, &self.lock())
    }

    pub fn into_underlying(self) -> UnderlyingArchive {
        self.archive.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, UnderlyingArchive> {
        self.archive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds a file object for this archive's family from the bytes of `origin`.
    ///
    /// TES4 files are compressed when the archive-wide flag is set, FO4 files when the archive
    /// was created compressed. FO4 texture archives expect DDS data, which is split into chunks
    /// along its mip levels.
    fn build_file(&self, data: Vec<u8>, origin: &Path) -> Result<UnderlyingFile> {
        let result = if self.compressed {
            CompressionResult::Compressed
        } else {
            CompressionResult::Decompressed
        };
        match self.version.format() {
            FileFormat::Tes3 => Ok(tes3::File::from(data.into_boxed_slice()).into()),
            FileFormat::Tes4 => {
                let options = tes4::FileReadOptions::builder()
                    .version(self.resolve()?)
                    .compression_result(result)
                    .build();
                let file = tes4::File::read(Copied(&data), &options)
                    .map_err(codec::build_failure(origin))?;
                Ok(file.into())
            }
            FileFormat::Fo4 => {
                let options = fo4::FileReadOptions::builder()
                    .format(self.resolve()?)
                    .mip_chunk_width(self.tuning.chunk_width)
                    .mip_chunk_height(self.tuning.chunk_height)
                    .compression_format(fo4::CompressionFormat::Zip)
                    .compression_level(self.tuning.level.to_fo4())
                    .compression_result(result)
                    .build();
                let file = fo4::File::read(Copied(&data), &options)
                    .map_err(codec::build_failure(origin))?;
                Ok(file.into())
            }
        }
    }
}

/// Maps the version token a codec read from `path` onto a logical version.
fn logical_version<T: NativeVersion + Debug>(native: T, path: &Path) -> Result<ArchiveVersion> {
    native.to_version().ok_or_else(|| {
        Error::InvalidData(format!(
            "'{}': unsupported archive version {:?}",
            path.display(),
            native
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use ba2::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn hierarchical_hello_scenario() -> std::result::Result<(), Box<dyn std::error::Error>> {
        // 1. Build
        let mut archive = Archive::new(ArchiveVersion::Sse, false);
        archive.add_file_bytes("sub/dir/file.txt", b"hello".to_vec())?;
        assert_eq!(archive.file_count(), 1);

        // 2. Unpack
        let out = tempdir()?;
        archive.unpack(out.path())?;

        let written: Vec<_> = WalkDir::new(out.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        assert_eq!(written, vec![out.path().join("sub/dir/file.txt")]);
        assert_eq!(fs::read(&written[0])?, b"hello");
        Ok(())
    }

    #[test]
    fn last_write_wins_and_count_stays_per_directory() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let archive = Archive::new(ArchiveVersion::Tes4, false);
        archive.add_file_bytes("meshes/a.nif", b"first".to_vec())?;
        archive.add_file_bytes("Meshes\\A.NIF", b"second".to_vec())?;
        archive.add_file_bytes("meshes/b.nif", b"other".to_vec())?;
        assert_eq!(archive.file_count(), 1);

        let UnderlyingArchive::Tes4(inner, _) = archive.into_underlying() else {
            panic!("expected a tes4 archive");
        };
        let directory = inner.get(&tes4::ArchiveKey::from("meshes")).unwrap();
        assert_eq!(directory.len(), 2);
        let file = directory.get(&tes4::DirectoryKey::from("a.nif")).unwrap();
        assert_eq!(file.as_bytes(), b"second");
        Ok(())
    }

    #[test]
    fn foreign_files_are_rejected() {
        let archive = Archive::new(ArchiveVersion::Fo4, true);
        archive.add_file_bytes("keep.txt", b"keep".to_vec()).unwrap();

        let err = archive
            .insert_file("other.txt", tes4::File::from_decompressed(b"x").into())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.to_string().contains("tes4"));
        assert_eq!(archive.file_count(), 1);
    }

    #[test]
    fn compression_policy_follows_family() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let body = b"abcabcabc".repeat(100);

        let fo4 = Archive::new(ArchiveVersion::Fo4, true);
        fo4.add_file_bytes("a.txt", body.clone())?;
        let UnderlyingArchive::Fo4(inner) = fo4.into_underlying() else {
            panic!("expected a fo4 archive");
        };
        let file = inner.get(&fo4::ArchiveKey::from("a.txt")).unwrap();
        assert!(file.iter().all(|chunk| chunk.is_compressed()));

        let tes4 = Archive::new(ArchiveVersion::Fo3, true);
        tes4.add_file_bytes("a.txt", body.clone())?;
        let UnderlyingArchive::Tes4(inner, _) = tes4.into_underlying() else {
            panic!("expected a tes4 archive");
        };
        let root = inner.get(&tes4::ArchiveKey::from("")).unwrap();
        let file = root.get(&tes4::DirectoryKey::from("a.txt")).unwrap();
        assert!(file.is_compressed());
        assert_eq!(file.decompressed_len(), Some(body.len()));

        let tes3 = Archive::new(ArchiveVersion::Tes3, true);
        tes3.add_file_bytes("a.txt", body.clone())?;
        let UnderlyingArchive::Tes3(inner) = tes3.into_underlying() else {
            panic!("expected a tes3 archive");
        };
        let file = inner.get(&tes3::ArchiveKey::from("a.txt")).unwrap();
        assert_eq!(file.as_bytes(), &body[..]);
        Ok(())
    }

    #[test]
    fn add_file_requires_root_prefix() {
        let archive = Archive::default();
        let err = archive
            .add_file(Path::new("/data"), Path::new("/elsewhere/a.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StripPrefix);
    }

    #[test]
    fn failed_read_resets_to_default() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let bogus = dir.path().join("bogus.bsa");
        fs::write(&bogus, b"not an archive")?;

        let mut archive = Archive::new(ArchiveVersion::Fo4, true);
        archive.add_file_bytes("a.txt", vec![0; 16])?;

        let err = archive.read(&bogus).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatUnrecognized);
        assert_eq!(archive.version(), ArchiveVersion::Tes3);
        assert_eq!(archive.format(), FileFormat::Tes3);
        assert!(!archive.is_compressed());
        assert_eq!(archive.file_count(), 0);
        Ok(())
    }

    #[test]
    fn resolve_through_facade() {
        let archive = Archive::new(ArchiveVersion::Fo4dx, false);
        assert_eq!(archive.resolve::<fo4::Format>().unwrap(), fo4::Format::DX10);
        assert_eq!(
            archive.resolve::<u32>().unwrap_err().kind(),
            ErrorKind::ConsistencyViolation
        );
    }
}
