// Tagging options

use serde::Deserialize;

/// Vendor string written into every Vorbis comment block
pub const DEFAULT_VENDOR: &str = concat!("oxitag ", env!("CARGO_PKG_VERSION"));

/// Largest image that fits a FLAC PICTURE block (24-bit length) with a modest header
pub const DEFAULT_MAX_COVER_BYTES: usize = 0x00FF_FFFF - 1024;

/// Options shared by every write performed through a `Tagger`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TagOptions {
    pub vendor: String,
    /// Resolve and embed cover art when the metadata carries a cover id
    pub embed_cover: bool,
    /// Covers larger than this are skipped
    pub max_cover_bytes: usize,
}

impl Default for TagOptions {
    fn default() -> Self {
        TagOptions {
            vendor: DEFAULT_VENDOR.to_string(),
            embed_cover: true,
            max_cover_bytes: DEFAULT_MAX_COVER_BYTES,
        }
    }
}

impl TagOptions {
    /// Parse options from JSON; absent keys keep their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
