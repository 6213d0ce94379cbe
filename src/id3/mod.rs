// ID3 metadata handling module
//
// MP3 files are only read. ID3v2 at the head of the file is authoritative; the
// ID3v1 trailer fills whatever ID3v2 left empty.

pub mod frames;
pub mod v1;
pub mod v2;

pub use frames::AttachedPicture;
pub use v1::Id3v1Tag;
pub use v2::{Id3Frame, Id3v2Header, Id3v2Tag};

use tracing::debug;

use crate::error::Result;
use crate::field_mapping::{apply_text, FieldMappings, StandardField};
use crate::metadata::{non_empty, parse_year, CoverArt, TagValues};
use crate::utils::encoding::decode_text_frame;

/// Values from the ID3v2 text frames
fn read_v2(tag: &Id3v2Tag) -> TagValues {
    let mut values = TagValues::default();
    let mut band = None;
    for frame in &tag.frames {
        let Some(field) = FieldMappings::from_id3v2(&frame.frame_id) else {
            continue;
        };
        if field == StandardField::Cover {
            continue;
        }
        let text = decode_text_frame(&frame.data);
        if field == StandardField::AlbumArtist && band.is_none() {
            band = non_empty(&text);
        }
        apply_text(&mut values, field, &text);
    }
    // TPE1 is preferred; TPE2 only stands in for a missing lead artist
    if values.artists.is_empty() {
        if let Some(band) = band {
            values.add_artist(&band);
        }
    }
    values
}

fn read_v1(tag: Id3v1Tag) -> TagValues {
    let mut values = TagValues {
        title: non_empty(&tag.title),
        album: non_empty(&tag.album),
        year: parse_year(&tag.year),
        track_number: tag.track.map(u32::from),
        ..TagValues::default()
    };
    values.add_artist(&tag.artist);
    values
}

/// Read tag values from an MP3 buffer
pub fn read_tags(data: &[u8]) -> Result<TagValues> {
    let mut values = match Id3v2Tag::read(data)? {
        Some(tag) => read_v2(&tag),
        None => TagValues::default(),
    };
    if let Some(tag) = Id3v1Tag::read(data) {
        debug!("supplementing with ID3v1 trailer");
        values.fill_missing(read_v1(tag));
    }
    Ok(values)
}

/// First APIC frame, front cover preferred
pub fn read_cover(data: &[u8]) -> Result<Option<CoverArt>> {
    let Some(tag) = Id3v2Tag::read(data)? else {
        return Ok(None);
    };
    let mut first = None;
    for frame in tag.frames.iter().filter(|f| f.frame_id == FieldMappings::ID3V2_COVER) {
        let picture = AttachedPicture::parse(&frame.data)?;
        if picture.picture_type == frames::PICTURE_FRONT_COVER {
            return Ok(Some(picture.into_cover_art()));
        }
        first.get_or_insert(picture);
    }
    Ok(first.map(AttachedPicture::into_cover_art))
}
