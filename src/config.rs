//! Tuning knobs applied when building archive entries.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::fo4;
use crate::error::{Error, Result};

/// zlib settings used when compressing FO4 chunks.
///
/// TES4 archives have a single zlib/LZ4 setting per version and ignore this.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Default zlib level, 15-bit window. What the PC release of Fallout 4 ships.
    #[default]
    Normal,
    /// Best zlib level with a 12-bit window, as used by Xbox archives.
    Xbox,
    /// Best zlib level, 15-bit window.
    Best,
}

impl CompressionLevel {
    pub(crate) fn to_fo4(self) -> fo4::CompressionLevel {
        match self {
            CompressionLevel::Normal => fo4::CompressionLevel::FO4,
            CompressionLevel::Xbox => fo4::CompressionLevel::FO4Xbox,
            CompressionLevel::Best => fo4::CompressionLevel::SF,
        }
    }
}

/// Holds all tuning options for building archive entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Tuning {
    /// Width of the texture area whose mip data fills one FO4 DirectX chunk.
    pub chunk_width: usize,
    /// Height of the texture area whose mip data fills one FO4 DirectX chunk.
    pub chunk_height: usize,
    /// zlib settings for FO4 chunks.
    pub level: CompressionLevel,
    /// Prefix every TES4 payload with its full path (Fallout 3 and later only).
    pub embed_file_names: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            chunk_width: 512,
            chunk_height: 512,
            level: CompressionLevel::Normal,
            embed_file_names: false,
        }
    }
}

impl Tuning {
    /// Loads tuning from a JSON document. Missing fields take their default value.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::read(e, path))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidData(format!("tuning file '{}': {}", path.display(), e)))
    }
}
