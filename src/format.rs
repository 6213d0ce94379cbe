// Container and image format detection
//
// Detection always runs on the actual bytes first: upstream delivery may hand back a
// different container than the quality that was requested. Hints are only consulted
// when the signature is not recognized.

use serde::Serialize;
use std::path::Path;

use crate::flac::FLAC_SIGNATURE;
use crate::mp4::MP4_SIGNATURE;

/// Audio container detected in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Flac,
    Mp4,
    Mp3,
    Unknown,
}

impl AudioFormat {
    /// Classify a buffer by its leading signature bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.starts_with(FLAC_SIGNATURE) {
            return AudioFormat::Flac;
        }
        if data.len() >= 8 && &data[4..8] == MP4_SIGNATURE {
            return AudioFormat::Mp4;
        }
        if data.starts_with(b"ID3") {
            return AudioFormat::Mp3;
        }
        // Bare MPEG audio frame sync
        if data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xE0) == 0xE0 {
            return AudioFormat::Mp3;
        }
        AudioFormat::Unknown
    }

    /// Classify a MIME type or a download quality label
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.trim().to_ascii_lowercase();
        let mime = hint.split(';').next().unwrap_or_default().trim();
        match mime {
            "audio/flac" | "audio/x-flac" => AudioFormat::Flac,
            "audio/mp4" | "audio/x-m4a" | "audio/m4a" | "audio/aac" | "audio/x-aac" => {
                AudioFormat::Mp4
            }
            "audio/mpeg" | "audio/mp3" => AudioFormat::Mp3,
            "hi_res_lossless" | "hi_res" | "lossless" => AudioFormat::Flac,
            "high" | "low" => AudioFormat::Mp4,
            _ => AudioFormat::Unknown,
        }
    }

    /// Classify a file name by its extension
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("flac") => AudioFormat::Flac,
            Some("m4a") | Some("mp4") | Some("m4b") | Some("aac") => AudioFormat::Mp4,
            Some("mp3") => AudioFormat::Mp3,
            _ => AudioFormat::Unknown,
        }
    }

    /// Bytes first, then the hint
    pub fn detect(data: &[u8], hint: Option<&str>) -> Self {
        match AudioFormat::from_bytes(data) {
            AudioFormat::Unknown => hint.map(AudioFormat::from_hint).unwrap_or(AudioFormat::Unknown),
            format => format,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cover image type detected from its own signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Unknown,
}

impl ImageFormat {
    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if data.starts_with(&Self::PNG_SIGNATURE) {
            ImageFormat::Png
        } else if data.starts_with(b"GIF8") {
            ImageFormat::Gif
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            ImageFormat::WebP
        } else {
            ImageFormat::Unknown
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
            "image/png" => ImageFormat::Png,
            "image/gif" => ImageFormat::Gif,
            "image/webp" => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    /// MIME type, defaulting to JPEG when the signature is unknown
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Jpeg | ImageFormat::Unknown => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Jpeg | ImageFormat::Unknown => "jpg",
        }
    }

    /// Pixel dimensions from a PNG IHDR chunk; other formats report none
    pub fn dimensions(data: &[u8]) -> Option<(u32, u32, u32)> {
        if ImageFormat::detect(data) != ImageFormat::Png || data.len() < 26 || &data[12..16] != b"IHDR" {
            return None;
        }
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        let bit_depth = data[24] as u32;
        let channels = match data[25] {
            0 => 1, // greyscale
            2 => 3, // truecolor
            3 => 1, // indexed
            4 => 2, // greyscale + alpha
            6 => 4, // truecolor + alpha
            _ => 0,
        };
        Some((width, height, bit_depth * channels))
    }
}
