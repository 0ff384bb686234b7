use bethpack::{Archive, ArchiveVersion, FileFormat};
use rand::{thread_rng, Rng, RngCore};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    thread_rng().fill_bytes(&mut data);
    data
}

/// A BC1 (DXT1) texture with a full legacy DDS header, as DirectXTex would write it.
fn dxt1_texture(width: u32, height: u32, mips: u32) -> Vec<u8> {
    let level_size = |level: u32| {
        let w = (width >> level).max(1);
        let h = (height >> level).max(1);
        w.div_ceil(4) * h.div_ceil(4) * 8
    };
    let caps = if mips > 1 { 0x0040_1008 } else { 0x1000 };
    let mut header = vec![124, 0x000A_1007, height, width, level_size(0), 1, mips];
    header.extend([0; 11]);
    header.extend([32, 0x4, u32::from_le_bytes(*b"DXT1"), 0, 0, 0, 0, 0]);
    header.extend([caps, 0, 0, 0, 0]);

    let mut dds = b"DDS ".to_vec();
    for field in header {
        dds.extend_from_slice(&field.to_le_bytes());
    }
    let body: u32 = (0..mips).map(level_size).sum();
    dds.extend(random_bytes(body as usize));
    dds
}

/// Half random, half repetitive, so compressed payloads actually shrink.
fn mixed_bytes(len: usize) -> Vec<u8> {
    let mut data = random_bytes(len / 2);
    data.extend(b"0123456789".iter().cycle().take(len - len / 2));
    data
}

fn check_roundtrip(version: ArchiveVersion, compressed: bool) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup: build an archive from in-memory payloads. Texture archives only hold DDS files.
    let entries = if version == ArchiveVersion::Fo4dx {
        vec![
            ("textures/clutter/bucket.dds", dxt1_texture(512, 512, 10)),
            ("textures/sky/clouds.dds", dxt1_texture(64, 32, 7)),
            ("icon.dds", dxt1_texture(4, 4, 1)),
        ]
    } else {
        vec![
            ("meshes/clutter/bucket.nif", mixed_bytes(4096)),
            ("textures/clutter/bucket.dds", mixed_bytes(700_000)),
            ("sound/fx/drip.wav", random_bytes(thread_rng().gen_range(1..2048))),
            ("readme.txt", b"root level".to_vec()),
            ("empty.bin", Vec::new()),
        ]
    };
    let archive = Archive::new(version, compressed);
    for (key, data) in &entries {
        archive.add_file_bytes(key, data.clone())?;
    }

    // 2. Write and read back
    let dir = tempdir()?;
    let path = dir.path().join("test.bsa");
    archive.write(&path)?;

    let mut read = Archive::open(&path)?;
    assert_eq!(read.version(), version);
    assert_eq!(read.format(), version.format());
    assert_eq!(read.file_count(), archive.file_count());
    if version.format() != FileFormat::Tes3 {
        assert_eq!(read.is_compressed(), compressed);
    }

    // 3. Unpack and compare
    let out = dir.path().join("out");
    read.unpack(&out)?;
    for (key, data) in &entries {
        let extracted = fs::read(out.join(key))?;
        assert_eq!(&extracted, data, "{version:?} compressed={compressed} {key}");
    }
    Ok(())
}

#[test]
fn every_version_roundtrips() -> Result<(), Box<dyn std::error::Error>> {
    for version in ArchiveVersion::ALL {
        for compressed in [false, true] {
            check_roundtrip(version, compressed)?;
        }
    }
    Ok(())
}

#[test]
fn hierarchical_counts_directories() -> Result<(), Box<dyn std::error::Error>> {
    let archive = Archive::new(ArchiveVersion::Fo3, false);
    archive.add_file_bytes("sub/dir/file.txt", b"hello".to_vec())?;
    archive.add_file_bytes("sub/dir/file.txt", b"hello again".to_vec())?;
    archive.add_file_bytes("sub/dir/other.txt", b"other".to_vec())?;
    archive.add_file_bytes("sub/sibling.txt", b"sibling".to_vec())?;
    assert_eq!(archive.file_count(), 2);

    let dir = tempdir()?;
    let path = dir.path().join("count.bsa");
    archive.write(&path)?;

    let mut read = Archive::open(&path)?;
    assert_eq!(read.file_count(), 2);
    read.unpack(dir.path())?;
    assert_eq!(fs::read(dir.path().join("sub/dir/file.txt"))?, b"hello again");
    Ok(())
}

#[test]
fn files_added_from_disk_keep_relative_paths() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup: a small loose-file tree
    let source = tempdir()?;
    let nested = source.path().join("Textures").join("Armor");
    fs::create_dir_all(&nested)?;
    let plate = random_bytes(5000);
    fs::write(nested.join("Plate.dds"), &plate)?;
    fs::write(source.path().join("notes.txt"), b"notes")?;

    // 2. Pack into an FO4 archive
    let archive = Archive::new(ArchiveVersion::Fo4, true);
    archive.add_file(source.path(), &nested.join("Plate.dds"))?;
    archive.add_file(source.path(), &source.path().join("notes.txt"))?;

    let dir = tempdir()?;
    let path = dir.path().join("loose.ba2");
    archive.write(&path)?;

    // 3. Unpack
    let mut read = Archive::open(&path)?;
    let out = dir.path().join("out");
    read.unpack(&out)?;
    assert_eq!(fs::read(out.join("textures/armor/plate.dds"))?, plate);
    assert_eq!(fs::read(out.join("notes.txt"))?, b"notes");
    Ok(())
}

#[test]
fn tes3_keys_are_lowercased_on_disk() -> Result<(), Box<dyn std::error::Error>> {
    let archive = Archive::new(ArchiveVersion::Tes3, false);
    archive.add_file_bytes(Path::new("Meshes/Chair.NIF"), b"chair".to_vec())?;

    let dir = tempdir()?;
    let path = dir.path().join("mw.bsa");
    archive.write(&path)?;

    let mut read = Archive::open(&path)?;
    read.unpack(dir.path())?;
    assert_eq!(fs::read(dir.path().join("meshes/chair.nif"))?, b"chair");
    Ok(())
}

#[test]
fn unpack_matching_filters_by_glob() -> Result<(), Box<dyn std::error::Error>> {
    let mut archive = Archive::new(ArchiveVersion::Sse, true);
    archive.add_file_bytes("textures/a.dds", b"a".to_vec())?;
    archive.add_file_bytes("textures/b.png", b"b".to_vec())?;
    archive.add_file_bytes("meshes/c.nif", b"c".to_vec())?;

    let out = tempdir()?;
    let written = archive.unpack_matching(out.path(), Some("Textures/*.DDS"))?;
    assert_eq!(written, 1);
    assert!(out.path().join("textures/a.dds").exists());
    assert!(!out.path().join("textures/b.png").exists());
    assert!(!out.path().join("meshes").exists());
    Ok(())
}

#[test]
fn overwriting_an_archive_is_atomic() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("replace.ba2");

    let first = Archive::new(ArchiveVersion::Fo4, false);
    first.add_file_bytes("one.txt", b"1".to_vec())?;
    first.write(&path)?;

    let second = Archive::new(ArchiveVersion::Fo4dx, false);
    second.add_file_bytes("two.dds", dxt1_texture(256, 256, 9))?;
    second.write(&path)?;

    let read = Archive::open(&path)?;
    assert_eq!(read.version(), ArchiveVersion::Fo4dx);
    assert_eq!(read.file_count(), 1);

    let leftovers: Vec<_> = fs::read_dir(dir.path())?.collect::<Result<_, _>>()?;
    assert_eq!(leftovers.len(), 1);
    Ok(())
}
