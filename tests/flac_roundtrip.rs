use oxitag::flac::{self, BlockChain, BlockType, VorbisComment};
use oxitag::{read_track_metadata, write_flac_tags, write_mp4_tags, TrackMetadata};

const STREAMINFO: [u8; 34] = [
    0x10, 0x00, 0x10, 0x00, 0x00, 0x00, 0x0E, 0x00, 0x3A, 0x2B, 0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00,
    0xB1, 0x40, 0x5D, 0x8C, 0x15, 0x0E, 0x7B, 0x64, 0x31, 0x45, 0x0A, 0x3C, 0x77, 0x01, 0x6E, 0x2F,
    0x90, 0x4C,
];

const FRAMES: [u8; 12] = [0xFF, 0xF8, 0x69, 0x18, 0x00, 0x00, 0xBF, 0x03, 0x58, 0xFD, 0x03, 0x12];

fn block(block_type: u8, is_last: bool, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![block_type | if is_last { 0x80 } else { 0 }];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
    out.extend_from_slice(payload);
    out
}

fn mp4_atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// STREAMINFO, the given extra blocks, then audio frames
fn flac_file(extra: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    data.extend(block(0, extra.is_empty(), &STREAMINFO));
    for (i, (block_type, payload)) in extra.iter().enumerate() {
        data.extend(block(*block_type, i == extra.len() - 1, payload));
    }
    data.extend_from_slice(&FRAMES);
    data
}

fn sample_metadata() -> TrackMetadata {
    TrackMetadata {
        title: Some("Blue in Green".to_string()),
        artist: Some("Miles Davis".to_string()),
        album: Some("Kind of Blue".to_string()),
        album_artist: Some("Miles Davis".to_string()),
        track_number: Some(3),
        total_tracks: Some(5),
        release_date: Some("1959-08-17".to_string()),
        copyright: Some("(P) 1959 Columbia".to_string()),
        isrc: Some("USSM15900113".to_string()),
        cover_id: None,
    }
}

fn jpeg() -> Vec<u8> {
    let mut image = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    image.extend_from_slice(b"JFIF\0");
    image.resize(64, 0xAB);
    image
}

fn assert_well_formed(data: &[u8]) -> BlockChain {
    assert_eq!(&data[..4], &[0x66, 0x4C, 0x61, 0x43]);
    let chain = BlockChain::parse(data).unwrap();
    assert_eq!(chain.blocks[0].header.block_type, BlockType::StreamInfo);
    let last_flags: Vec<bool> = chain.blocks.iter().map(|b| b.header.is_last).collect();
    assert_eq!(last_flags.iter().filter(|&&last| last).count(), 1);
    assert_eq!(last_flags.last(), Some(&true));
    chain
}

#[test]
fn written_tags_read_back() {
    let original = flac_file(&[]);
    let tagged = write_flac_tags(&original, &sample_metadata(), None);
    assert_well_formed(&tagged);

    let values = flac::read_tags(&tagged).unwrap();
    assert_eq!(values.title.as_deref(), Some("Blue in Green"));
    assert_eq!(values.artists, vec!["Miles Davis"]);
    assert_eq!(values.album.as_deref(), Some("Kind of Blue"));
    assert_eq!(values.year, Some(1959));
    assert_eq!((values.track_number, values.total_tracks), (Some(3), Some(5)));
    assert_eq!(values.isrc.as_deref(), Some("USSM15900113"));

    let metadata = read_track_metadata(&tagged, "ignored.flac");
    assert_eq!(metadata.title.as_deref(), Some("Blue in Green"));
    assert_eq!(metadata.artist.as_deref(), Some("Miles Davis"));
    assert_eq!(metadata.release_date.as_deref(), Some("1959"));
}

#[test]
fn album_artist_does_not_leak_into_artist() {
    let metadata = TrackMetadata {
        artist: Some("Lead".to_string()),
        album_artist: Some("Various Artists".to_string()),
        ..sample_metadata()
    };
    let tagged = write_flac_tags(&flac_file(&[]), &metadata, None);
    let read = read_track_metadata(&tagged, "ignored.flac");
    assert_eq!(read.title.as_deref(), Some("Blue in Green"));
    assert_eq!(read.artist.as_deref(), Some("Lead"));
    assert_eq!(read.album.as_deref(), Some("Kind of Blue"));
    assert_eq!(read.album_artist.as_deref(), Some("Various Artists"));

    // MP4 reads the same metadata back the same way
    let mut m4a = mp4_atom(b"ftyp", b"M4A \x00\x00\x02\x00");
    m4a.extend(mp4_atom(b"moov", &mp4_atom(b"mvhd", &[0u8; 100])));
    m4a.extend(mp4_atom(b"mdat", &[0u8; 16]));
    let tagged = write_mp4_tags(&m4a, &metadata, None);
    assert_eq!(read_track_metadata(&tagged, "ignored.m4a").artist.as_deref(), Some("Lead"));
}

#[test]
fn streaminfo_only_scenario() {
    let original = flac_file(&[]);
    let metadata = TrackMetadata {
        title: Some("A".to_string()),
        artist: Some("B".to_string()),
        album: Some("C".to_string()),
        track_number: Some(1),
        ..TrackMetadata::default()
    };
    let tagged = write_flac_tags(&original, &metadata, None);
    let chain = assert_well_formed(&tagged);

    assert_eq!(&tagged[chain.blocks[0].payload.clone()], &STREAMINFO[..]);

    let block = chain.find(BlockType::VorbisComment).unwrap();
    let comment = VorbisComment::read(&tagged[block.payload.clone()]).unwrap();
    let mut pairs: Vec<String> = comment
        .comments
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    pairs.sort();
    assert_eq!(pairs, ["ALBUM=C", "ARTIST=B", "TITLE=A", "TRACKNUMBER=1"]);
}

#[test]
fn second_run_does_not_duplicate_blocks() {
    let original = flac_file(&[(1, vec![0u8; 16])]);
    let cover = jpeg();
    let once = oxitag::flac::write_tags(
        &original,
        &sample_metadata(),
        Some(cover.as_slice()),
        &Default::default(),
    )
    .unwrap();
    let twice = oxitag::flac::write_tags(
        &once,
        &sample_metadata(),
        Some(cover.as_slice()),
        &Default::default(),
    )
    .unwrap();

    let chain = assert_well_formed(&twice);
    let count = |t: BlockType| chain.blocks.iter().filter(|b| b.header.block_type == t).count();
    assert_eq!(count(BlockType::VorbisComment), 1);
    assert_eq!(count(BlockType::Picture), 1);
    assert_eq!(count(BlockType::Padding), 1);
    assert_eq!(once, twice);
}

#[test]
fn audio_frames_are_byte_identical() {
    let original = flac_file(&[(4, VorbisComment::new("old").to_bytes()), (1, vec![0u8; 8])]);
    let tagged = write_flac_tags(&original, &sample_metadata(), Some(jpeg().as_slice()));
    let chain = assert_well_formed(&tagged);
    assert_eq!(&tagged[chain.audio_offset..], &FRAMES[..]);
}

#[test]
fn cover_round_trips() {
    let cover = jpeg();
    let tagged = write_flac_tags(&flac_file(&[]), &TrackMetadata::default(), Some(cover.as_slice()));
    let art = oxitag::read_cover_art(&tagged).unwrap();
    assert_eq!(art.mime_type, "image/jpeg");
    assert_eq!(art.data, cover);
}

#[test]
fn structural_failures_return_input() {
    let original = flac_file(&[]);

    let truncated = original[..10].to_vec();
    assert_eq!(write_flac_tags(&truncated, &sample_metadata(), None), truncated);

    // no block carries the last flag
    let mut no_last = b"fLaC".to_vec();
    no_last.extend(block(0, false, &STREAMINFO));
    assert_eq!(write_flac_tags(&no_last, &sample_metadata(), None), no_last);

    // first block is not STREAMINFO
    let mut wrong_first = b"fLaC".to_vec();
    wrong_first.extend(block(1, true, &[0u8; 4]));
    assert_eq!(write_flac_tags(&wrong_first, &sample_metadata(), None), wrong_first);

    // block type 127
    let mut invalid = b"fLaC".to_vec();
    invalid.extend(block(0, false, &STREAMINFO));
    invalid.extend(block(127, true, &[]));
    assert_eq!(write_flac_tags(&invalid, &sample_metadata(), None), invalid);
}
