// ID3v1 tag implementation

use encoding_rs::WINDOWS_1252;

/// ID3v1 tag structure
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Id3v1Tag {
    pub const TAG_SIZE: usize = 128;
    const TAG_ID: &'static [u8; 3] = b"TAG";

    /// Read the trailer from the last 128 bytes of a file buffer
    pub fn read(data: &[u8]) -> Option<Self> {
        let start = data.len().checked_sub(Self::TAG_SIZE)?;
        let buffer: &[u8; Self::TAG_SIZE] = data[start..].try_into().ok()?;
        if &buffer[0..3] != Self::TAG_ID {
            return None;
        }
        Some(Self::parse(buffer))
    }

    /// Parse ID3v1 tag from buffer
    fn parse(buffer: &[u8; Self::TAG_SIZE]) -> Self {
        // ID3v1.1: a zero byte before the last comment byte marks a track number
        let (comment, track) = if buffer[125] == 0 && buffer[126] != 0 {
            (Self::parse_string(&buffer[97..125]), Some(buffer[126]))
        } else {
            (Self::parse_string(&buffer[97..127]), None)
        };

        Id3v1Tag {
            title: Self::parse_string(&buffer[3..33]),
            artist: Self::parse_string(&buffer[33..63]),
            album: Self::parse_string(&buffer[63..93]),
            year: Self::parse_string(&buffer[93..97]),
            comment,
            track,
            genre: buffer[127],
        }
    }

    /// Parse a null-padded Latin-1 field
    fn parse_string(bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        WINDOWS_1252.decode(&bytes[..end]).0.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trailer(title: &str, artist: &str, album: &str, year: &str, track: u8) -> Vec<u8> {
        let mut tag = vec![0u8; 128];
        tag[0..3].copy_from_slice(b"TAG");
        tag[3..3 + title.len()].copy_from_slice(title.as_bytes());
        tag[33..33 + artist.len()].copy_from_slice(artist.as_bytes());
        tag[63..63 + album.len()].copy_from_slice(album.as_bytes());
        tag[93..93 + year.len()].copy_from_slice(year.as_bytes());
        tag[126] = track;
        tag[127] = 17;
        tag
    }

    #[test]
    fn reads_trailer_after_audio() {
        let mut data = vec![0xFFu8; 300];
        data.extend(trailer("Song", "Band", "Record", "1987", 4));
        let tag = Id3v1Tag::read(&data).unwrap();
        assert_eq!(tag.title, "Song");
        assert_eq!(tag.artist, "Band");
        assert_eq!(tag.album, "Record");
        assert_eq!(tag.year, "1987");
        assert_eq!(tag.track, Some(4));
        assert_eq!(tag.genre, 17);
    }

    #[test]
    fn plain_v1_has_no_track() {
        let mut data = trailer("Song", "", "", "", 0);
        data[125] = b'!';
        data[126] = b'!';
        assert_eq!(Id3v1Tag::read(&data).unwrap().track, None);
    }

    #[test]
    fn absent_or_short_trailer() {
        assert!(Id3v1Tag::read(&[0u8; 200]).is_none());
        assert!(Id3v1Tag::read(b"TAG").is_none());
    }
}
