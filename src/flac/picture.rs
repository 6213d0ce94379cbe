// FLAC PICTURE block

use crate::error::{Result, TagError};
use crate::format::ImageFormat;
use crate::utils::{ByteCursor, ByteWriter};

/// Picture types shared by FLAC and ID3v2 APIC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    Other,
    FileIcon,
    OtherFileIcon,
    CoverFront,
    CoverBack,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    VideoScreenCapture,
    BrightColouredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
    Undefined(u32),
}

impl PictureType {
    const NAMED: [PictureType; 21] = [
        PictureType::Other,
        PictureType::FileIcon,
        PictureType::OtherFileIcon,
        PictureType::CoverFront,
        PictureType::CoverBack,
        PictureType::LeafletPage,
        PictureType::Media,
        PictureType::LeadArtist,
        PictureType::Artist,
        PictureType::Conductor,
        PictureType::Band,
        PictureType::Composer,
        PictureType::Lyricist,
        PictureType::RecordingLocation,
        PictureType::DuringRecording,
        PictureType::DuringPerformance,
        PictureType::VideoScreenCapture,
        PictureType::BrightColouredFish,
        PictureType::Illustration,
        PictureType::BandLogo,
        PictureType::PublisherLogo,
    ];

    pub fn from_u32(value: u32) -> Self {
        Self::NAMED
            .get(value as usize)
            .copied()
            .unwrap_or(PictureType::Undefined(value))
    }

    pub fn to_u32(self) -> u32 {
        match self {
            PictureType::Undefined(value) => value,
            named => Self::NAMED
                .iter()
                .position(|&p| p == named)
                .map(|i| i as u32)
                .unwrap_or(0),
        }
    }
}

/// FLAC PICTURE block structure
#[derive(Debug, Clone, PartialEq)]
pub struct FlacPicture {
    pub picture_type: PictureType,
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub data: Vec<u8>,
}

impl FlacPicture {
    /// Front cover built from raw image bytes.
    ///
    /// The MIME type comes from the image's own signature (JPEG when unknown).
    /// Dimensions are filled for PNG and left at 0 (unknown) otherwise.
    pub fn front_cover(data: Vec<u8>) -> Self {
        let mime_type = ImageFormat::detect(&data).mime_type().to_string();
        let (width, height, depth) = ImageFormat::dimensions(&data).unwrap_or((0, 0, 0));
        FlacPicture {
            picture_type: PictureType::CoverFront,
            mime_type,
            description: String::new(),
            width,
            height,
            depth,
            colors: 0,
            data,
        }
    }

    /// Read FLAC PICTURE block from its payload (all integers big-endian)
    pub fn read_from_data(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let picture_type = PictureType::from_u32(cursor.read_be_u32()?);
        let mime_type = String::from_utf8_lossy(cursor.read_be_prefixed()?).to_string();
        let description = String::from_utf8_lossy(cursor.read_be_prefixed()?).to_string();
        let width = cursor.read_be_u32()?;
        let height = cursor.read_be_u32()?;
        let depth = cursor.read_be_u32()?;
        let colors = cursor.read_be_u32()?;
        let picture_data = cursor.read_be_prefixed()?.to_vec();

        Ok(FlacPicture {
            picture_type,
            mime_type,
            description,
            width,
            height,
            depth,
            colors,
            data: picture_data,
        })
    }

    /// Encode as a block payload
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let data_length = u32::try_from(self.data.len())
            .map_err(|_| TagError::malformed("picture larger than 4 GiB"))?;

        let mut writer = ByteWriter::with_capacity(32 + self.mime_type.len() + self.data.len());
        writer.put_be_u32(self.picture_type.to_u32());
        writer.put_be_u32(self.mime_type.len() as u32);
        writer.put_bytes(self.mime_type.as_bytes());
        writer.put_be_u32(self.description.len() as u32);
        writer.put_bytes(self.description.as_bytes());
        writer.put_be_u32(self.width);
        writer.put_be_u32(self.height);
        writer.put_be_u32(self.depth);
        writer.put_be_u32(self.colors);
        writer.put_be_u32(data_length);
        writer.put_bytes(&self.data);
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_type_mapping() {
        assert_eq!(PictureType::from_u32(3), PictureType::CoverFront);
        assert_eq!(PictureType::CoverFront.to_u32(), 3);
        assert_eq!(PictureType::from_u32(20), PictureType::PublisherLogo);
        assert_eq!(PictureType::from_u32(99), PictureType::Undefined(99));
        assert_eq!(PictureType::Undefined(99).to_u32(), 99);
    }

    #[test]
    fn front_cover_sniffs_mime() {
        let jpeg = FlacPicture::front_cover(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2]);
        assert_eq!(jpeg.mime_type, "image/jpeg");
        assert_eq!(jpeg.picture_type, PictureType::CoverFront);

        let unknown = FlacPicture::front_cover(vec![1, 2, 3]);
        assert_eq!(unknown.mime_type, "image/jpeg");
        assert_eq!((unknown.width, unknown.height), (0, 0));
    }

    #[test]
    fn payload_layout() {
        let picture = FlacPicture::front_cover(vec![0xFF, 0xD8, 0xFF]);
        let bytes = picture.to_bytes().unwrap();
        // type, mime length + "image/jpeg", empty description, 4 u32s, data length + data
        assert_eq!(bytes.len(), 4 + 4 + 10 + 4 + 16 + 4 + 3);
        assert_eq!(&bytes[0..4], &3u32.to_be_bytes());
        assert_eq!(&bytes[8..18], b"image/jpeg");
        assert_eq!(FlacPicture::read_from_data(&bytes).unwrap(), picture);
    }
}
