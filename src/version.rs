//! # Version Resolution
//!
//! Every logical [`ArchiveVersion`] maps to one representation and one native token type. Both
//! facts live in a single table which construction, reading and [`resolve`] all consult.

use tracing::error;

use crate::codec::{fo4, tes4, FileFormat, TES3_VERSION};
use crate::error::{Error, Result};
use crate::format::UnderlyingArchive;

/// Logical archive version, ordered from oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ArchiveVersion {
    /// Morrowind.
    #[default]
    Tes3,
    /// Oblivion.
    Tes4,
    /// Fallout 3, New Vegas and Skyrim LE.
    Fo3,
    /// Skyrim Special Edition.
    Sse,
    /// Fallout 4, general archives.
    Fo4,
    /// Fallout 4, texture archives.
    Fo4dx,
}

/// The type of native token a version resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain `u32` version number.
    Number,
    /// [`tes4::Version`].
    Tes4Version,
    /// [`fo4::Format`].
    Fo4Format,
}

struct VersionEntry {
    version: ArchiveVersion,
    name: &'static str,
    format: FileFormat,
    token: TokenKind,
}

static VERSION_TABLE: [VersionEntry; 6] = [
    VersionEntry {
        version: ArchiveVersion::Tes3,
        name: "tes3",
        format: FileFormat::Tes3,
        token: TokenKind::Number,
    },
    VersionEntry {
        version: ArchiveVersion::Tes4,
        name: "tes4",
        format: FileFormat::Tes4,
        token: TokenKind::Tes4Version,
    },
    VersionEntry {
        version: ArchiveVersion::Fo3,
        name: "fo3",
        format: FileFormat::Tes4,
        token: TokenKind::Tes4Version,
    },
    VersionEntry {
        version: ArchiveVersion::Sse,
        name: "sse",
        format: FileFormat::Tes4,
        token: TokenKind::Tes4Version,
    },
    VersionEntry {
        version: ArchiveVersion::Fo4,
        name: "fo4",
        format: FileFormat::Fo4,
        token: TokenKind::Fo4Format,
    },
    VersionEntry {
        version: ArchiveVersion::Fo4dx,
        name: "fo4dx",
        format: FileFormat::Fo4,
        token: TokenKind::Fo4Format,
    },
];

impl ArchiveVersion {
    pub const ALL: [ArchiveVersion; 6] = [
        ArchiveVersion::Tes3,
        ArchiveVersion::Tes4,
        ArchiveVersion::Fo3,
        ArchiveVersion::Sse,
        ArchiveVersion::Fo4,
        ArchiveVersion::Fo4dx,
    ];

    fn entry(self) -> &'static VersionEntry {
        &VERSION_TABLE[self as usize]
    }

    /// The representation this version is stored in.
    pub fn format(self) -> FileFormat {
        self.entry().format
    }

    /// The native token type this version resolves to.
    pub fn token_kind(self) -> TokenKind {
        self.entry().token
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Parses a version from its [`ArchiveVersion::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        VERSION_TABLE
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.version)
    }
}

/// A representation-specific version token understood by one codec.
pub trait NativeVersion: Copy {
    /// Which table column this type answers to.
    const KIND: TokenKind;
    /// Type name used in diagnostics.
    const NAME: &'static str;

    /// The token for `version`, or `None` if `version` uses another token type.
    fn from_version(version: ArchiveVersion) -> Option<Self>;

    /// The logical version a codec reported after reading an archive, if this crate models it.
    fn to_version(self) -> Option<ArchiveVersion>;
}

impl NativeVersion for u32 {
    const KIND: TokenKind = TokenKind::Number;
    const NAME: &'static str = "u32";

    fn from_version(version: ArchiveVersion) -> Option<Self> {
        match version {
            ArchiveVersion::Tes3 => Some(TES3_VERSION),
            _ => None,
        }
    }

    fn to_version(self) -> Option<ArchiveVersion> {
        (self == TES3_VERSION).then_some(ArchiveVersion::Tes3)
    }
}

impl NativeVersion for tes4::Version {
    const KIND: TokenKind = TokenKind::Tes4Version;
    const NAME: &'static str = "tes4::Version";

    fn from_version(version: ArchiveVersion) -> Option<Self> {
        match version {
            ArchiveVersion::Tes4 => Some(tes4::Version::TES4),
            ArchiveVersion::Fo3 => Some(tes4::Version::FO3),
            ArchiveVersion::Sse => Some(tes4::Version::SSE),
            _ => None,
        }
    }

    fn to_version(self) -> Option<ArchiveVersion> {
        Some(match self {
            tes4::Version::v103 => ArchiveVersion::Tes4,
            tes4::Version::v104 => ArchiveVersion::Fo3,
            tes4::Version::v105 => ArchiveVersion::Sse,
        })
    }
}

impl NativeVersion for fo4::Format {
    const KIND: TokenKind = TokenKind::Fo4Format;
    const NAME: &'static str = "fo4::Format";

    fn from_version(version: ArchiveVersion) -> Option<Self> {
        match version {
            ArchiveVersion::Fo4 => Some(fo4::Format::GNRL),
            ArchiveVersion::Fo4dx => Some(fo4::Format::DX10),
            _ => None,
        }
    }

    /// Console (`GNMF`) texture archives have no logical version.
    fn to_version(self) -> Option<ArchiveVersion> {
        match self {
            fo4::Format::GNRL => Some(ArchiveVersion::Fo4),
            fo4::Format::DX10 => Some(ArchiveVersion::Fo4dx),
            fo4::Format::GNMF => None,
        }
    }
}

/// Resolves `version` into the native token `T` for `archive`.
///
/// Succeeds only if `T` is the token type recorded for `version` and `archive` holds the
/// representation recorded for `version`. Anything else means the archive's state is
/// inconsistent, reported as [`Error::ConsistencyViolation`].
pub fn resolve<T: NativeVersion>(version: ArchiveVersion, archive: &UnderlyingArchive) -> Result<T> {
    let entry = version.entry();
    let token = if entry.token == T::KIND && entry.format == archive.tag() {
        T::from_version(version)
    } else {
        None
    };
    token.ok_or_else(|| {
        error!(
            version = version.name(),
            requested = T::NAME,
            archive = archive.identifier(),
            "archive version does not match its representation"
        );
        Error::ConsistencyViolation {
            version: version.name(),
            requested: T::NAME,
            archive: archive.identifier(),
        }
    })
}
