// FLAC metadata engine
//
// Tagging rebuilds only the metadata chain: STREAMINFO and every other block are
// copied, VORBIS_COMMENT and PICTURE are replaced, and the audio frames after the
// chain are appended untouched.

pub mod metadata;
pub mod picture;
pub mod vorbis;

pub use metadata::{BlockChain, BlockHeader, BlockSpan, BlockType, FLAC_SIGNATURE};
pub use picture::{FlacPicture, PictureType};
pub use vorbis::VorbisComment;

use tracing::{debug, warn};

use crate::config::TagOptions;
use crate::error::Result;
use crate::field_mapping::{apply_text, FieldMappings, StandardField};
use crate::metadata::{CoverArt, TagValues, TrackMetadata};
use crate::utils::ByteWriter;

/// Largest payload a metadata block header can describe
const MAX_BLOCK_LENGTH: usize = 0x00FF_FFFF;

/// Build the replacement comment block, one entry per populated field
pub fn build_comment(metadata: &TrackMetadata, vendor: &str) -> VorbisComment {
    let fields = [
        (StandardField::Title, metadata.title.clone()),
        (StandardField::Artist, metadata.artist.clone()),
        (StandardField::Album, metadata.album.clone()),
        (StandardField::AlbumArtist, metadata.album_artist.clone()),
        (StandardField::TrackNumber, metadata.track_number.map(|n| n.to_string())),
        (StandardField::TrackTotal, metadata.total_tracks.map(|n| n.to_string())),
        (StandardField::Year, metadata.release_year().map(|y| y.to_string())),
        (StandardField::Copyright, metadata.copyright.clone()),
        (StandardField::Isrc, metadata.isrc.clone()),
    ];

    let mut comment = VorbisComment::new(vendor);
    for (field, value) in fields {
        let (Some(key), Some(value)) = (FieldMappings::to_vorbis(field), value) else {
            continue;
        };
        if !value.trim().is_empty() {
            comment.set(key, value);
        }
    }
    comment
}

/// Picture block payload for `cover`, or `None` when it cannot be embedded
fn cover_payload(cover: &[u8], options: &TagOptions) -> Option<Vec<u8>> {
    if cover.is_empty() {
        return None;
    }
    if cover.len() > options.max_cover_bytes {
        warn!(bytes = cover.len(), "cover art exceeds size limit, skipping picture");
        return None;
    }
    match FlacPicture::front_cover(cover.to_vec()).to_bytes() {
        Ok(payload) if payload.len() <= MAX_BLOCK_LENGTH => Some(payload),
        Ok(payload) => {
            warn!(bytes = payload.len(), "picture block too large for FLAC, skipping");
            None
        }
        Err(e) => {
            warn!(error = %e, "could not encode picture block");
            None
        }
    }
}

/// Write tags into a FLAC buffer and return the rebuilt file.
///
/// Existing VORBIS_COMMENT and PICTURE blocks are dropped; the new comment (and
/// picture, when available) follow the kept blocks, and only the final block carries
/// the last-block flag.
pub fn write_tags(
    data: &[u8],
    metadata: &TrackMetadata,
    cover: Option<&[u8]>,
    options: &TagOptions,
) -> Result<Vec<u8>> {
    let chain = BlockChain::parse(data)?;

    let comment = build_comment(metadata, &options.vendor).to_bytes();
    let picture = cover.and_then(|c| cover_payload(c, options));

    let mut blocks: Vec<(BlockType, &[u8])> = chain
        .blocks
        .iter()
        .filter(|b| {
            !matches!(
                b.header.block_type,
                BlockType::VorbisComment | BlockType::Picture
            )
        })
        .map(|b| (b.header.block_type, &data[b.payload.clone()]))
        .collect();
    let dropped = chain.blocks.len() - blocks.len();
    blocks.push((BlockType::VorbisComment, comment.as_slice()));
    if let Some(picture) = picture.as_deref() {
        blocks.push((BlockType::Picture, picture));
    }

    let audio = &data[chain.audio_offset..];
    let metadata_len: usize = blocks.iter().map(|(_, p)| BlockHeader::SIZE + p.len()).sum();
    let mut writer = ByteWriter::with_capacity(FLAC_SIGNATURE.len() + metadata_len + audio.len());
    writer.put_bytes(FLAC_SIGNATURE);
    let last_index = blocks.len() - 1;
    for (index, (block_type, payload)) in blocks.iter().enumerate() {
        metadata::write_block(&mut writer, *block_type, index == last_index, payload)?;
    }
    writer.put_bytes(audio);

    debug!(
        kept = blocks.len(),
        dropped,
        with_picture = picture.is_some(),
        audio_bytes = audio.len(),
        "rebuilt FLAC metadata"
    );
    Ok(writer.into_inner())
}

/// Read tag values from the first VORBIS_COMMENT block.
///
/// ALBUMARTIST stands in for the artist list only when no ARTIST entry exists. A
/// file without a comment block yields empty values.
pub fn read_tags(data: &[u8]) -> Result<TagValues> {
    let chain = BlockChain::parse(data)?;
    let mut values = TagValues::default();

    let Some(block) = chain.find(BlockType::VorbisComment) else {
        debug!("FLAC file has no VORBIS_COMMENT block");
        return Ok(values);
    };

    let comment = VorbisComment::read(&data[block.payload.clone()])?;
    let mut album_artists = Vec::new();
    for (key, value) in &comment.comments {
        let Some(field) = FieldMappings::from_vorbis(key) else {
            continue;
        };
        if field == StandardField::AlbumArtist {
            album_artists.push(value.as_str());
        }
        apply_text(&mut values, field, value);
    }
    if values.artists.is_empty() {
        for artist in album_artists {
            values.add_artist(artist);
        }
    }
    Ok(values)
}

/// Front cover if present, otherwise the first picture
pub fn read_cover(data: &[u8]) -> Result<Option<CoverArt>> {
    let chain = BlockChain::parse(data)?;
    let mut first = None;
    for block in chain.blocks.iter().filter(|b| b.header.block_type == BlockType::Picture) {
        let picture = FlacPicture::read_from_data(&data[block.payload.clone()])?;
        if picture.picture_type == PictureType::CoverFront {
            return Ok(Some(to_cover_art(picture)));
        }
        first.get_or_insert(picture);
    }
    Ok(first.map(to_cover_art))
}

fn to_cover_art(picture: FlacPicture) -> CoverArt {
    CoverArt {
        mime_type: picture.mime_type,
        width: picture.width,
        height: picture.height,
        description: picture.description,
        data: picture.data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TagError;

    const STREAMINFO: [u8; 34] = [
        0x10, 0x00, 0x10, 0x00, 0x00, 0x00, 0x0E, 0x00, 0x12, 0x34, 0x0A, 0xC4, 0x42, 0xF0,
        0x00, 0x00, 0xAC, 0x44, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A,
        0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10,
    ];
    const FRAMES: [u8; 6] = [0xFF, 0xF8, 0x69, 0x08, 0x00, 0x42];

    fn minimal_flac() -> Vec<u8> {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.push(0x80); // STREAMINFO, last
        data.extend_from_slice(&[0x00, 0x00, 34]);
        data.extend_from_slice(&STREAMINFO);
        data.extend_from_slice(&FRAMES);
        data
    }

    fn sample_metadata() -> TrackMetadata {
        TrackMetadata {
            title: Some("A".to_string()),
            artist: Some("B".to_string()),
            album: Some("C".to_string()),
            track_number: Some(1),
            ..TrackMetadata::default()
        }
    }

    #[test]
    fn comment_holds_only_populated_fields() {
        let metadata = TrackMetadata {
            release_date: Some("2020-02-02".to_string()),
            isrc: Some("USRC17607839".to_string()),
            copyright: Some("  ".to_string()),
            ..sample_metadata()
        };
        let comment = build_comment(&metadata, "vendor");
        let keys: Vec<&str> = comment.comments.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["TITLE", "ARTIST", "ALBUM", "TRACKNUMBER", "DATE", "ISRC"]);
        assert_eq!(comment.get("DATE").map(String::as_str), Some("2020"));
    }

    #[test]
    fn tags_streaminfo_only_file() {
        let input = minimal_flac();
        let output = write_tags(&input, &sample_metadata(), None, &TagOptions::default()).unwrap();

        let chain = BlockChain::parse(&output).unwrap();
        assert_eq!(chain.blocks.len(), 2);
        assert_eq!(&output[chain.blocks[0].payload.clone()], &STREAMINFO);
        assert!(!chain.blocks[0].header.is_last);
        assert!(chain.blocks[1].header.is_last);
        assert_eq!(&output[chain.audio_offset..], &FRAMES);

        let comment = VorbisComment::read(&output[chain.blocks[1].payload.clone()]).unwrap();
        assert_eq!(comment.get("TITLE").map(String::as_str), Some("A"));
        assert_eq!(comment.get("ARTIST").map(String::as_str), Some("B"));
        assert_eq!(comment.get("ALBUM").map(String::as_str), Some("C"));
        assert_eq!(comment.get("TRACKNUMBER").map(String::as_str), Some("1"));
    }

    #[test]
    fn picture_is_last_block() {
        let cover = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let output = write_tags(
            &minimal_flac(),
            &sample_metadata(),
            Some(cover.as_slice()),
            &TagOptions::default(),
        )
        .unwrap();

        let chain = BlockChain::parse(&output).unwrap();
        let types: Vec<BlockType> = chain.blocks.iter().map(|b| b.header.block_type).collect();
        assert_eq!(
            types,
            vec![BlockType::StreamInfo, BlockType::VorbisComment, BlockType::Picture]
        );
        assert_eq!(chain.blocks.iter().filter(|b| b.header.is_last).count(), 1);
        assert!(chain.blocks[2].header.is_last);

        let art = read_cover(&output).unwrap().unwrap();
        assert_eq!(art.mime_type, "image/jpeg");
        assert_eq!(art.data, cover);
    }

    #[test]
    fn oversized_cover_is_skipped() {
        let options = TagOptions {
            max_cover_bytes: 4,
            ..TagOptions::default()
        };
        let output = write_tags(
            &minimal_flac(),
            &sample_metadata(),
            Some(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00][..]),
            &options,
        )
        .unwrap();
        let chain = BlockChain::parse(&output).unwrap();
        assert!(chain.find(BlockType::Picture).is_none());
    }

    #[test]
    fn padding_is_kept_with_last_flag_cleared() {
        let mut input = FLAC_SIGNATURE.to_vec();
        input.push(0x00);
        input.extend_from_slice(&[0x00, 0x00, 34]);
        input.extend_from_slice(&STREAMINFO);
        input.push(0x81); // PADDING, last
        input.extend_from_slice(&[0x00, 0x00, 0x04, 0, 0, 0, 0]);
        input.extend_from_slice(&FRAMES);

        let output = write_tags(&input, &sample_metadata(), None, &TagOptions::default()).unwrap();
        let chain = BlockChain::parse(&output).unwrap();
        assert_eq!(chain.blocks[1].header.block_type, BlockType::Padding);
        assert!(!chain.blocks[1].header.is_last);
        assert_eq!(chain.blocks[2].header.block_type, BlockType::VorbisComment);
        assert!(chain.blocks[2].header.is_last);
    }

    #[test]
    fn album_artist_stays_out_of_artists() {
        let metadata = TrackMetadata {
            album_artist: Some("Various".to_string()),
            ..sample_metadata()
        };
        let output = write_tags(&minimal_flac(), &metadata, None, &TagOptions::default()).unwrap();
        let values = read_tags(&output).unwrap();
        assert_eq!(values.title.as_deref(), Some("A"));
        assert_eq!(values.album.as_deref(), Some("C"));
        assert_eq!(values.artists, vec!["B"]);
        assert_eq!(values.album_artist.as_deref(), Some("Various"));
        assert_eq!(values.track_number, Some(1));
    }

    #[test]
    fn album_artist_fills_missing_artist() {
        let metadata = TrackMetadata {
            artist: None,
            album_artist: Some("Various".to_string()),
            ..sample_metadata()
        };
        let output = write_tags(&minimal_flac(), &metadata, None, &TagOptions::default()).unwrap();
        assert_eq!(read_tags(&output).unwrap().artists, vec!["Various"]);
    }

    #[test]
    fn read_without_comment_is_empty() {
        assert!(read_tags(&minimal_flac()).unwrap().is_empty());
        assert!(read_cover(&minimal_flac()).unwrap().is_none());
    }

    #[test]
    fn write_rejects_truncated_input() {
        let input = minimal_flac();
        assert!(matches!(
            write_tags(&input[..10], &sample_metadata(), None, &TagOptions::default()),
            Err(TagError::TruncatedData { .. })
        ));
    }
}
