// ID3 frame definitions and parsers

use crate::error::{Result, TagError};
use crate::format::ImageFormat;
use crate::metadata::CoverArt;
use crate::utils::encoding::{decode_text, split_terminated, TextEncoding};

/// Front cover picture type of an APIC frame
pub const PICTURE_FRONT_COVER: u8 = 3;

/// Attached picture frame (APIC)
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedPicture {
    pub mime_type: String,
    pub picture_type: u8,
    pub description: String,
    pub data: Vec<u8>,
}

impl AttachedPicture {
    /// Decode an APIC payload: encoding, MIME (Latin-1, null-terminated), picture
    /// type, description (in the frame encoding), image bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (&encoding_byte, rest) = data
            .split_first()
            .ok_or_else(|| TagError::malformed("empty APIC frame"))?;
        let encoding = TextEncoding::from_byte(encoding_byte);

        let (mime, rest) = split_terminated(rest, TextEncoding::Iso8859_1);
        let (&picture_type, rest) = rest
            .split_first()
            .ok_or_else(|| TagError::malformed("APIC frame ends before picture type"))?;
        let (description, image) = split_terminated(rest, encoding);

        let image = image.to_vec();
        let mime = decode_text(mime, TextEncoding::Iso8859_1);
        let mime_type = match mime.trim() {
            m if m.contains('/') => m.to_ascii_lowercase(),
            // v2.2-style short formats ("PNG", "JPG") still show up in v2.3 files
            m => match ImageFormat::from_mime(&format!("image/{}", m)) {
                ImageFormat::Unknown => ImageFormat::detect(&image),
                known => known,
            }
            .mime_type()
            .to_string(),
        };

        Ok(AttachedPicture {
            mime_type,
            picture_type,
            description: decode_text(description, encoding),
            data: image,
        })
    }

    pub fn into_cover_art(self) -> CoverArt {
        let (width, height, _) = ImageFormat::dimensions(&self.data).unwrap_or((0, 0, 0));
        CoverArt {
            mime_type: self.mime_type,
            width,
            height,
            description: self.description,
            data: self.data,
        }
    }
}
