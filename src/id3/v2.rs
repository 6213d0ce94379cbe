// ID3v2 tag implementation (v2.3 and v2.4, read-only)

use tracing::debug;

use crate::error::Result;
use crate::utils::io::synchsafe_u32;
use crate::utils::ByteCursor;

/// ID3v2 header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id3v2Header {
    pub version: (u8, u8),
    pub flags: u8,
    /// Tag size excluding the 10-byte header
    pub size: u32,
}

/// ID3v2 tag structure
#[derive(Debug)]
pub struct Id3v2Tag {
    pub header: Id3v2Header,
    pub frames: Vec<Id3Frame>,
}

/// ID3v2 frame structure
#[derive(Debug, Clone, PartialEq)]
pub struct Id3Frame {
    pub frame_id: String,
    pub flags: u16,
    pub data: Vec<u8>,
}

impl Id3v2Header {
    pub const SIZE: usize = 10;
    const ID: &'static [u8; 3] = b"ID3";
    const FLAG_UNSYNCHRONISATION: u8 = 0x80;
    const FLAG_EXTENDED_HEADER: u8 = 0x40;

    /// Read the header at the start of `data`; `None` when there is no "ID3" marker
    pub fn read(data: &[u8]) -> Result<Option<Self>> {
        let mut cursor = ByteCursor::new(data);
        if cursor.peek_bytes(3) != Some(&Self::ID[..]) {
            return Ok(None);
        }
        cursor.skip(3)?;
        let major = cursor.read_u8()?;
        let revision = cursor.read_u8()?;
        let flags = cursor.read_u8()?;
        let size = cursor.read_synchsafe_u32()?;
        Ok(Some(Id3v2Header {
            version: (major, revision),
            flags,
            size,
        }))
    }

    pub fn has_extended_header(&self) -> bool {
        self.flags & Self::FLAG_EXTENDED_HEADER != 0
    }

    pub fn is_unsynchronised(&self) -> bool {
        self.flags & Self::FLAG_UNSYNCHRONISATION != 0
    }
}

impl Id3v2Tag {
    /// Parse the tag at the start of `data`.
    ///
    /// Returns `None` when there is no tag or the major version is not 3 or 4.
    /// A frame that runs past the tag ends the frame list without failing.
    pub fn read(data: &[u8]) -> Result<Option<Self>> {
        let Some(header) = Id3v2Header::read(data)? else {
            return Ok(None);
        };
        if !matches!(header.version.0, 3 | 4) {
            debug!(version = header.version.0, "unsupported ID3v2 version");
            return Ok(None);
        }

        // Clamp to the buffer so a tag declaring more than it holds still yields its frames
        let end = (Id3v2Header::SIZE + header.size as usize).min(data.len());
        let mut cursor = ByteCursor::new(&data[..end]);
        cursor.seek(Id3v2Header::SIZE)?;

        if header.has_extended_header() {
            let size = match header.version.0 {
                // v2.4: synchsafe, counts itself
                4 => cursor.read_synchsafe_u32()? as usize,
                // v2.3: plain, excludes its own 4-byte size field
                _ => cursor.read_be_u32()? as usize + 4,
            };
            cursor.skip(size.saturating_sub(4))?;
        }

        let mut frames = Vec::new();
        while let Some(frame) = Id3Frame::read(&mut cursor, &header) {
            frames.push(frame);
        }
        debug!(frames = frames.len(), version = header.version.0, "parsed ID3v2 tag");
        Ok(Some(Id3v2Tag { header, frames }))
    }

    /// First frame with the given id
    pub fn frame(&self, frame_id: &str) -> Option<&Id3Frame> {
        self.frames.iter().find(|f| f.frame_id == frame_id)
    }
}

impl Id3Frame {
    const HEADER_SIZE: usize = 10;

    // v2.4 format flags
    const GROUPING: u16 = 0x0040;
    const COMPRESSED: u16 = 0x0008;
    const ENCRYPTED: u16 = 0x0004;
    const UNSYNCHRONISED: u16 = 0x0002;
    const DATA_LENGTH: u16 = 0x0001;

    /// Read the next frame; `None` at padding, at the end of the tag or on a frame
    /// that does not fit.
    ///
    /// v2.4 frames come back with their group byte and data length indicator stripped
    /// and unsynchronisation undone. Compressed or encrypted frames keep no data.
    pub fn read(cursor: &mut ByteCursor<'_>, tag_header: &Id3v2Header) -> Option<Self> {
        let major_version = tag_header.version.0;
        let header = cursor.peek_bytes(Self::HEADER_SIZE)?;

        // Padding (or garbage) starts where a frame id is not [A-Z0-9]{4}
        let id = &header[0..4];
        if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return None;
        }

        let size = if major_version >= 4 {
            synchsafe_u32(&header[4..8])
        } else {
            u32::from_be_bytes([header[4], header[5], header[6], header[7]])
        } as usize;
        let flags = u16::from_be_bytes([header[8], header[9]]);

        if size > cursor.remaining() - Self::HEADER_SIZE {
            debug!(frame = %String::from_utf8_lossy(id), size, "frame runs past the tag");
            return None;
        }
        let frame_id = String::from_utf8_lossy(id).into_owned();
        cursor.skip(Self::HEADER_SIZE).ok()?;
        let data = cursor.read_bytes(size).ok()?;
        let data = if major_version >= 4 {
            Self::v4_payload(&frame_id, data, flags, tag_header.is_unsynchronised())
        } else {
            data.to_vec()
        };

        Some(Id3Frame {
            frame_id,
            flags,
            data,
        })
    }

    fn v4_payload(frame_id: &str, data: &[u8], flags: u16, tag_unsynchronised: bool) -> Vec<u8> {
        if flags & (Self::COMPRESSED | Self::ENCRYPTED) != 0 {
            debug!(frame = frame_id, flags, "skipping compressed or encrypted frame");
            return Vec::new();
        }
        let mut skip = 0;
        if flags & Self::GROUPING != 0 {
            skip += 1;
        }
        if flags & Self::DATA_LENGTH != 0 {
            skip += 4;
        }
        let data = data.get(skip..).unwrap_or_default();
        if flags & Self::UNSYNCHRONISED != 0 || tag_unsynchronised {
            remove_unsynchronisation(data)
        } else {
            data.to_vec()
        }
    }
}

/// Drop the 0x00 inserted after every 0xFF
fn remove_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous = 0u8;
    for &byte in data {
        if !(previous == 0xFF && byte == 0x00) {
            out.push(byte);
        }
        previous = byte;
    }
    out
}
