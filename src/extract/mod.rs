//! # Archive Extraction
//!
//! Materializes every entry of an archive under a destination directory.
//!
//! TES3 and FO4 entries are written in one parallel pass. TES4 archives are walked directory by
//! directory, writing the files of each directory in parallel. Extraction is fail-fast: the
//! first entry that cannot be written aborts the whole operation.

use std::fs;
use std::path::{Path, PathBuf};

use ba2::{BStr, ByteSlice as _};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::codec::{self, fo4, tes4};
use crate::error::{Error, Result};
use crate::format::UnderlyingArchive;
use crate::path::{backslash_to_slash, str_match, virtual_to_local_path, virtual_to_local_path_in};
use crate::version::{resolve, ArchiveVersion};

/// Extracts the entries of `archive` into `out_dir`.
///
/// # Arguments
/// * `archive` - The representation to extract.
/// * `version` - The archive's logical version, resolved into the codec's native token.
/// * `out_dir` - Destination root. Created if missing; existing subdirectories are reused.
/// * `pattern` - Optional case-insensitive glob; only entries whose virtual path matches it are
///   written.
///
/// Returns the number of files written.
pub fn unpack(
    archive: &UnderlyingArchive,
    version: ArchiveVersion,
    out_dir: &Path,
    pattern: Option<&str>,
) -> Result<usize> {
    make_dir(out_dir)?;

    let written = match archive {
        UnderlyingArchive::Tes3(a) => {
            let entries = select(
                a.iter().map(|(key, file)| {
                    let key = virtual_key(key.name());
                    let local = virtual_to_local_path(&key);
                    (key, local, file)
                }),
                out_dir,
                pattern,
            );
            entries
                .par_iter()
                .try_for_each(|(dest, file)| -> Result<()> {
                    make_parent(dest)?;
                    codec::write_loose(dest, |out| {
                        file.write(out).map_err(codec::write_failure(dest))
                    })
                })?;
            entries.len()
        }
        UnderlyingArchive::Tes4(a, _) => {
            let options = tes4::FileCompressionOptions::builder()
                .version(resolve(version, archive)?)
                .build();
            let mut written = 0;
            for (dir_key, directory) in a.iter() {
                let dir_name = virtual_key(dir_key.name());
                let entries = select(
                    directory.iter().map(|(name, file)| {
                        let name = virtual_key(name.name());
                        let local = virtual_to_local_path_in(&dir_name, &name);
                        (join_key(&dir_name, &name), local, file)
                    }),
                    out_dir,
                    pattern,
                );
                if entries.is_empty() {
                    continue;
                }
                debug!(directory = %dir_name, files = entries.len(), "extracting directory");
                make_dir(&out_dir.join(virtual_to_local_path(&dir_name)))?;
                entries
                    .par_iter()
                    .try_for_each(|(dest, file)| -> Result<()> {
                        make_parent(dest)?;
                        codec::write_loose(dest, |out| {
                            file.write(out, &options).map_err(codec::write_failure(dest))
                        })
                    })?;
                written += entries.len();
            }
            written
        }
        UnderlyingArchive::Fo4(a) => {
            let options =
                fo4::FileWriteOptions::from(&codec::fo4_archive_options(resolve(version, archive)?));
            let entries = select(
                a.iter().map(|(key, file)| {
                    let key = virtual_key(key.name());
                    let local = virtual_to_local_path(&key);
                    (key, local, file)
                }),
                out_dir,
                pattern,
            );
            entries
                .par_iter()
                .try_for_each(|(dest, file)| -> Result<()> {
                    make_parent(dest)?;
                    codec::write_loose(dest, |out| {
                        file.write(out, &options).map_err(codec::write_failure(dest))
                    })
                })?;
            entries.len()
        }
    };

    info!(
        archive = archive.identifier(),
        files = written,
        out = %out_dir.display(),
        "extraction complete"
    );
    Ok(written)
}

/// A stored key name in `/`-separated form.
fn virtual_key(name: &BStr) -> String {
    backslash_to_slash(&name.to_str_lossy())
}

/// Joins a TES4 directory key and file key. The root directory is stored as `.`.
fn join_key(directory: &str, name: &str) -> String {
    if directory.is_empty() || directory == "." {
        name.to_string()
    } else {
        format!("{directory}/{name}")
    }
}

/// Keeps the entries whose virtual key matches `pattern` and maps them to their destination
/// paths. Entries with no usable local path are skipped.
fn select<'a, F: 'a>(
    entries: impl Iterator<Item = (String, PathBuf, &'a F)>,
    out_dir: &Path,
    pattern: Option<&str>,
) -> Vec<(PathBuf, &'a F)> {
    entries
        .filter(|(key, _, _)| pattern.map_or(true, |p| str_match(key, p, false)))
        .filter_map(|(key, local, file)| {
            if local.as_os_str().is_empty() {
                warn!(key = %key, "skipping entry without a local path");
                return None;
            }
            Some((out_dir.join(local), file))
        })
        .collect()
}

fn make_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => make_dir(parent),
        None => Ok(()),
    }
}

/// Creates `path` unless it already exists. Losing a creation race to another worker is fine.
fn make_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(e) => Err(Error::write(e, path)),
    }
}
