// Unified metadata field mapping
//
// Each container names the same fields differently:
// - Vorbis comments (FLAC): TITLE, ARTIST, ALBUM, ...
// - MP4: iTunes item atoms (©nam, ©ART, ©alb, ...)
// - ID3v2: frame ids (TIT2, TPE1, TALB, ...)
//
// Readers translate their native keys into `StandardField` and store values through
// `apply_text`, so every format fills `TagValues` the same way.

use crate::metadata::{non_empty, parse_track_pair, parse_year, TagValues};

/// Standard metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardField {
    Title,
    Artist,
    Album,
    AlbumArtist,
    TrackNumber,
    TrackTotal,
    Year,
    Copyright,
    Isrc,
    Cover,
}

/// Format-specific field names
pub struct FieldMappings;

impl FieldMappings {
    // Vorbis comment keys, written upper-case
    pub const VORBIS_TITLE: &'static str = "TITLE";
    pub const VORBIS_ARTIST: &'static str = "ARTIST";
    pub const VORBIS_ALBUM: &'static str = "ALBUM";
    pub const VORBIS_ALBUM_ARTIST: &'static str = "ALBUMARTIST";
    pub const VORBIS_TRACK: &'static str = "TRACKNUMBER";
    pub const VORBIS_TRACK_TOTAL: &'static str = "TRACKTOTAL";
    pub const VORBIS_YEAR: &'static str = "DATE";
    pub const VORBIS_COPYRIGHT: &'static str = "COPYRIGHT";
    pub const VORBIS_ISRC: &'static str = "ISRC";

    // MP4 iTunes item atoms
    pub const MP4_TITLE: [u8; 4] = *b"\xA9nam"; // ©nam
    pub const MP4_ARTIST: [u8; 4] = *b"\xA9ART"; // ©ART
    pub const MP4_ALBUM: [u8; 4] = *b"\xA9alb"; // ©alb
    pub const MP4_ALBUM_ARTIST: [u8; 4] = *b"aART";
    pub const MP4_YEAR: [u8; 4] = *b"\xA9day"; // ©day
    pub const MP4_TRACK: [u8; 4] = *b"trkn";
    pub const MP4_COPYRIGHT: [u8; 4] = *b"cprt";
    pub const MP4_COVER: [u8; 4] = *b"covr";
    pub const MP4_FREEFORM: [u8; 4] = *b"----";

    // ID3v2 frame ids
    pub const ID3V2_TITLE: &'static str = "TIT2";
    pub const ID3V2_ARTIST: &'static str = "TPE1";
    pub const ID3V2_ALBUM_ARTIST: &'static str = "TPE2";
    pub const ID3V2_ALBUM: &'static str = "TALB";
    pub const ID3V2_YEAR: &'static str = "TDRC";
    pub const ID3V2_LEGACY_YEAR: &'static str = "TYER";
    pub const ID3V2_TRACK: &'static str = "TRCK";
    pub const ID3V2_COPYRIGHT: &'static str = "TCOP";
    pub const ID3V2_ISRC: &'static str = "TSRC";
    pub const ID3V2_COVER: &'static str = "APIC";

    /// Vorbis comment key for a standard field
    pub fn to_vorbis(field: StandardField) -> Option<&'static str> {
        match field {
            StandardField::Title => Some(Self::VORBIS_TITLE),
            StandardField::Artist => Some(Self::VORBIS_ARTIST),
            StandardField::Album => Some(Self::VORBIS_ALBUM),
            StandardField::AlbumArtist => Some(Self::VORBIS_ALBUM_ARTIST),
            StandardField::TrackNumber => Some(Self::VORBIS_TRACK),
            StandardField::TrackTotal => Some(Self::VORBIS_TRACK_TOTAL),
            StandardField::Year => Some(Self::VORBIS_YEAR),
            StandardField::Copyright => Some(Self::VORBIS_COPYRIGHT),
            StandardField::Isrc => Some(Self::VORBIS_ISRC),
            // Covers live in PICTURE blocks
            StandardField::Cover => None,
        }
    }

    /// Convert Vorbis comment key (any case) to standard field
    pub fn from_vorbis(key: &str) -> Option<StandardField> {
        match key.to_ascii_uppercase().as_str() {
            Self::VORBIS_TITLE => Some(StandardField::Title),
            Self::VORBIS_ARTIST => Some(StandardField::Artist),
            Self::VORBIS_ALBUM => Some(StandardField::Album),
            Self::VORBIS_ALBUM_ARTIST | "ALBUM ARTIST" | "ALBUM_ARTIST" => {
                Some(StandardField::AlbumArtist)
            }
            Self::VORBIS_TRACK => Some(StandardField::TrackNumber),
            Self::VORBIS_TRACK_TOTAL | "TOTALTRACKS" => Some(StandardField::TrackTotal),
            Self::VORBIS_YEAR | "YEAR" => Some(StandardField::Year),
            Self::VORBIS_COPYRIGHT => Some(StandardField::Copyright),
            Self::VORBIS_ISRC => Some(StandardField::Isrc),
            _ => None,
        }
    }

    /// Convert MP4 item atom type to standard field
    pub fn from_mp4(kind: &[u8; 4]) -> Option<StandardField> {
        match *kind {
            Self::MP4_TITLE => Some(StandardField::Title),
            Self::MP4_ARTIST => Some(StandardField::Artist),
            Self::MP4_ALBUM => Some(StandardField::Album),
            Self::MP4_ALBUM_ARTIST => Some(StandardField::AlbumArtist),
            Self::MP4_YEAR => Some(StandardField::Year),
            Self::MP4_TRACK => Some(StandardField::TrackNumber),
            Self::MP4_COPYRIGHT => Some(StandardField::Copyright),
            Self::MP4_COVER => Some(StandardField::Cover),
            _ => None,
        }
    }

    /// Convert ID3v2 frame id to standard field
    pub fn from_id3v2(frame_id: &str) -> Option<StandardField> {
        match frame_id {
            Self::ID3V2_TITLE => Some(StandardField::Title),
            Self::ID3V2_ARTIST => Some(StandardField::Artist),
            Self::ID3V2_ALBUM_ARTIST => Some(StandardField::AlbumArtist),
            Self::ID3V2_ALBUM => Some(StandardField::Album),
            Self::ID3V2_YEAR | Self::ID3V2_LEGACY_YEAR => Some(StandardField::Year),
            Self::ID3V2_TRACK => Some(StandardField::TrackNumber),
            Self::ID3V2_COPYRIGHT => Some(StandardField::Copyright),
            Self::ID3V2_ISRC => Some(StandardField::Isrc),
            Self::ID3V2_COVER => Some(StandardField::Cover),
            _ => None,
        }
    }
}

/// Store a textual value for `field` in `values`.
///
/// First value wins for single-valued fields; artists accumulate. Track numbers accept
/// the "n/total" form.
pub fn apply_text(values: &mut TagValues, field: StandardField, text: &str) {
    fn set(slot: &mut Option<String>, text: &str) {
        if slot.is_none() {
            *slot = non_empty(text);
        }
    }

    match field {
        StandardField::Title => set(&mut values.title, text),
        StandardField::Artist => values.add_artist(text),
        StandardField::Album => set(&mut values.album, text),
        StandardField::AlbumArtist => set(&mut values.album_artist, text),
        StandardField::TrackNumber => {
            let (track, total) = parse_track_pair(text);
            values.track_number = values.track_number.or(track);
            values.total_tracks = values.total_tracks.or(total);
        }
        StandardField::TrackTotal => {
            values.total_tracks = values.total_tracks.or(text.trim().parse().ok());
        }
        StandardField::Year => values.year = values.year.or(parse_year(text)),
        StandardField::Copyright => set(&mut values.copyright, text),
        StandardField::Isrc => set(&mut values.isrc, text),
        StandardField::Cover => {}
    }
}
