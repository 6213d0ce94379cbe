// iTunes-style item list: building and decoding `data` atoms

use crate::field_mapping::FieldMappings;
use crate::format::ImageFormat;
use crate::metadata::TrackMetadata;
use crate::mp4::atom::{Atom, FourCC, DATA, HDLR, ILST, MEAN, META, NAME, UDTA};

/// iTunes namespace for freeform items
pub const ITUNES_NAMESPACE: &str = "com.apple.iTunes";

/// Type indicator of a `data` atom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Implicit,
    Utf8,
    Jpeg,
    Png,
    Other(u32),
}

impl DataType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => DataType::Implicit,
            1 => DataType::Utf8,
            13 => DataType::Jpeg,
            14 => DataType::Png,
            other => DataType::Other(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            DataType::Implicit => 0,
            DataType::Utf8 => 1,
            DataType::Jpeg => 13,
            DataType::Png => 14,
            DataType::Other(other) => other,
        }
    }
}

/// `data` atom: type indicator, locale (always 0), payload
pub fn data_atom(data_type: DataType, payload: &[u8]) -> Atom {
    let mut body = Vec::with_capacity(8 + payload.len());
    body.extend_from_slice(&data_type.to_u32().to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(payload);
    Atom::leaf(DATA, body)
}

/// Decode the first `data` child of an item into (type, payload)
pub fn item_data(item: &Atom) -> Option<(DataType, &[u8])> {
    let body = item.child(DATA)?.leaf_data()?;
    if body.len() < 8 {
        return None;
    }
    // the top byte is the data atom's version
    let type_indicator = u32::from_be_bytes([0, body[1], body[2], body[3]]);
    Some((DataType::from_u32(type_indicator), &body[8..]))
}

pub fn text_item(kind: FourCC, text: &str) -> Atom {
    Atom::container(kind, vec![data_atom(DataType::Utf8, text.as_bytes())])
}

/// `trkn`: 2 reserved bytes, track, total, 2 reserved bytes
pub fn track_item(track: u16, total: u16) -> Atom {
    let mut payload = [0u8; 8];
    payload[2..4].copy_from_slice(&track.to_be_bytes());
    payload[4..6].copy_from_slice(&total.to_be_bytes());
    Atom::container(
        FieldMappings::MP4_TRACK,
        vec![data_atom(DataType::Implicit, &payload)],
    )
}

/// Decode a `trkn` payload into (track, total); zero means absent
pub fn parse_track_payload(payload: &[u8]) -> (Option<u32>, Option<u32>) {
    let read = |range: std::ops::Range<usize>| {
        payload
            .get(range)
            .map(|b| u16::from_be_bytes([b[0], b[1]]) as u32)
            .filter(|&n| n > 0)
    };
    (read(2..4), read(4..6))
}

/// `covr` with type 14 for PNG, 13 otherwise
pub fn cover_item(image: &[u8]) -> Atom {
    let data_type = match ImageFormat::detect(image) {
        ImageFormat::Png => DataType::Png,
        _ => DataType::Jpeg,
    };
    Atom::container(FieldMappings::MP4_COVER, vec![data_atom(data_type, image)])
}

/// `----` freeform item: mean (namespace), name, data
pub fn freeform_item(name: &str, value: &str) -> Atom {
    let mut mean = vec![0u8; 4];
    mean.extend_from_slice(ITUNES_NAMESPACE.as_bytes());
    let mut name_payload = vec![0u8; 4];
    name_payload.extend_from_slice(name.as_bytes());
    Atom::container(
        FieldMappings::MP4_FREEFORM,
        vec![
            Atom::leaf(MEAN, mean),
            Atom::leaf(NAME, name_payload),
            data_atom(DataType::Utf8, value.as_bytes()),
        ],
    )
}

/// Name of a freeform item, without its version/flags
pub fn freeform_name(item: &Atom) -> Option<String> {
    let payload = item.child(NAME)?.leaf_data()?;
    payload
        .get(4..)
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

/// Metadata handler (`mdir`/`appl`) required in front of `ilst`
pub fn handler_atom() -> Atom {
    let mut payload = Vec::with_capacity(25);
    payload.extend_from_slice(&[0u8; 4]); // version/flags
    payload.extend_from_slice(&[0u8; 4]); // pre_defined
    payload.extend_from_slice(b"mdir"); // handler type
    payload.extend_from_slice(b"appl"); // manufacturer
    payload.extend_from_slice(&[0u8; 8]); // reserved
    payload.push(0); // empty name
    Atom::leaf(HDLR, payload)
}

/// Item list for the populated fields of `metadata`
pub fn build_ilst(metadata: &TrackMetadata, cover: Option<&[u8]>) -> Atom {
    let mut items = Vec::new();
    let texts = [
        (FieldMappings::MP4_TITLE, metadata.title.as_deref()),
        (FieldMappings::MP4_ARTIST, metadata.artist.as_deref()),
        (FieldMappings::MP4_ALBUM, metadata.album.as_deref()),
        (FieldMappings::MP4_ALBUM_ARTIST, metadata.album_artist.as_deref()),
    ];
    for (kind, value) in texts {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            items.push(text_item(kind, value));
        }
    }
    if let Some(year) = metadata.release_year() {
        items.push(text_item(FieldMappings::MP4_YEAR, &format!("{:04}", year)));
    }
    if let Some(track) = metadata.track_number {
        let clamp = |n: u32| u16::try_from(n).unwrap_or(u16::MAX);
        items.push(track_item(clamp(track), clamp(metadata.total_tracks.unwrap_or(0))));
    }
    if let Some(copyright) = metadata.copyright.as_deref().filter(|v| !v.trim().is_empty()) {
        items.push(text_item(FieldMappings::MP4_COPYRIGHT, copyright));
    }
    if let Some(isrc) = metadata.isrc.as_deref().filter(|v| !v.trim().is_empty()) {
        items.push(freeform_item("ISRC", isrc));
    }
    if let Some(cover) = cover.filter(|c| !c.is_empty()) {
        items.push(cover_item(cover));
    }
    Atom::container(ILST, items)
}

/// `udta` → `meta` (full box) → `hdlr` + `ilst`
pub fn build_udta(metadata: &TrackMetadata, cover: Option<&[u8]>) -> Atom {
    let meta = Atom::full_container(
        META,
        vec![0u8; 4],
        vec![handler_atom(), build_ilst(metadata, cover)],
    );
    Atom::container(UDTA, vec![meta])
}
