// VORBIS_COMMENT block

use crate::error::Result;
use crate::utils::{ByteCursor, ByteWriter};

/// Vorbis comment structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VorbisComment {
    pub vendor_string: String,
    pub comments: Vec<(String, String)>,
}

impl VorbisComment {
    pub fn new(vendor: impl Into<String>) -> Self {
        VorbisComment {
            vendor_string: vendor.into(),
            comments: Vec::new(),
        }
    }

    /// Read Vorbis comment from a block payload.
    ///
    /// All lengths are little-endian u32. Entries without '=' are skipped.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let vendor_string = String::from_utf8_lossy(cursor.read_le_prefixed()?).to_string();

        let comment_count = cursor.read_le_u32()? as usize;
        // Each entry needs at least its 4-byte length
        let mut comments = Vec::with_capacity(comment_count.min(cursor.remaining() / 4));
        for _ in 0..comment_count {
            let comment_string = String::from_utf8_lossy(cursor.read_le_prefixed()?).to_string();
            if let Some((field, value)) = comment_string.split_once('=') {
                comments.push((field.to_string(), value.to_string()));
            }
        }

        Ok(VorbisComment {
            vendor_string,
            comments,
        })
    }

    /// Encode as a block payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.put_lp_string(&self.vendor_string);
        writer.put_le_u32(self.comments.len() as u32);
        for (field, value) in &self.comments {
            writer.put_lp_string(&format!("{}={}", field, value));
        }
        writer.into_inner()
    }

    /// Get a comment value by field name (case-insensitive)
    pub fn get(&self, field: &str) -> Option<&String> {
        self.comments
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v)
    }

    /// Replace every entry for `field` with a single upper-case entry
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.comments.retain(|(f, _)| !f.eq_ignore_ascii_case(field));
        self.comments.push((field.to_ascii_uppercase(), value.into()));
    }
}
