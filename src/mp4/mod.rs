// MP4/M4A metadata engine
//
// iTunes-style metadata lives in moov/udta/meta/ilst:
//
// ftyp
// moov
//   mvhd
//   trak/mdia/minf/stbl/{stco|co64}   absolute offsets into mdat
//   udta/meta/{hdlr, ilst}            replaced on write
// mdat
//
// Writing rebuilds moov with a fresh udta. When moov sits in front of mdat its size
// change moves the media, so every chunk offset is shifted by the same delta.

pub mod atom;
pub mod ilst;
pub mod offsets;

pub use atom::{Atom, AtomBody, AtomHeader, FourCC};
pub use ilst::DataType;

use tracing::{debug, warn};

use crate::config::TagOptions;
use crate::error::{Result, TagError};
use crate::field_mapping::{apply_text, FieldMappings, StandardField};
use crate::format::ImageFormat;
use crate::metadata::{CoverArt, TagValues, TrackMetadata};
use crate::utils::ByteWriter;
use atom::{fourcc_str, ILST, MDAT, META, MOOF, MOOV, UDTA};

/// Bytes 4..8 of every MP4 file
pub const MP4_SIGNATURE: &[u8; 4] = b"ftyp";

/// Positions of the atoms the rewrite depends on
#[derive(Debug, Clone, Copy)]
struct Layout {
    moov: AtomHeader,
    moov_before_mdat: bool,
}

impl Layout {
    /// Only a single moov with a single mdat is supported; fragmented files fail closed
    fn inspect(atoms: &[AtomHeader]) -> Result<Self> {
        if atoms.iter().any(|a| a.kind == MOOF) {
            return Err(TagError::UnsupportedFormat("fragmented MP4 (moof)".to_string()));
        }
        let mut moovs = atoms.iter().filter(|a| a.kind == MOOV);
        let moov = *moovs.next().ok_or_else(|| TagError::malformed("no moov atom"))?;
        if moovs.next().is_some() {
            return Err(TagError::malformed("more than one moov atom"));
        }
        let mdats: Vec<&AtomHeader> = atoms.iter().filter(|a| a.kind == MDAT).collect();
        let mdat = match mdats.as_slice() {
            [mdat] => **mdat,
            [] => return Err(TagError::malformed("no mdat atom")),
            _ => {
                return Err(TagError::UnsupportedFormat(format!(
                    "{} mdat atoms",
                    mdats.len()
                )))
            }
        };
        Ok(Layout {
            moov,
            moov_before_mdat: moov.offset < mdat.offset,
        })
    }
}

/// Write tags into an MP4 buffer and return the rebuilt file.
///
/// Bytes before and after `moov` (including all of `mdat`) are copied unchanged.
pub fn write_tags(
    data: &[u8],
    metadata: &TrackMetadata,
    cover: Option<&[u8]>,
    options: &TagOptions,
) -> Result<Vec<u8>> {
    let atoms = atom::scan(data)?;
    let layout = Layout::inspect(&atoms)?;
    let moov_header = layout.moov;

    let mut moov = Atom::parse(MOOV, &data[moov_header.payload()], None)?;
    let children = moov
        .children_mut()
        .ok_or_else(|| TagError::malformed("moov is not a container"))?;
    let had_udta = children.iter().any(|c| c.kind == UDTA);
    children.retain(|c| c.kind != UDTA);

    let cover = cover.filter(|c| {
        let fits = c.len() <= options.max_cover_bytes;
        if !fits {
            warn!(bytes = c.len(), "cover art exceeds size limit, skipping covr");
        }
        fits
    });
    children.push(ilst::build_udta(metadata, cover));

    let old_size = moov_header.size;
    let new_size = moov.size();
    let delta = i64::try_from(new_size)
        .ok()
        .zip(i64::try_from(old_size).ok())
        .map(|(new, old)| new - old)
        .ok_or_else(|| TagError::malformed("moov size out of range"))?;
    debug!(old_size, new_size, delta, had_udta, "rebuilt moov");

    if layout.moov_before_mdat && delta != 0 {
        offsets::shift_chunk_offsets(&mut moov, delta)?;
    }

    let tail = &data[moov_header.end()..];
    let mut writer =
        ByteWriter::with_capacity(moov_header.offset + new_size as usize + tail.len());
    writer.put_bytes(&data[..moov_header.offset]);
    moov.write(&mut writer);
    writer.put_bytes(tail);
    Ok(writer.into_inner())
}

/// Parsed `moov`, or `None` when the file has none
fn parse_moov(data: &[u8]) -> Result<Option<Atom>> {
    let atoms = atom::scan(data)?;
    let Some(header) = atoms.iter().find(|a| a.kind == MOOV) else {
        return Ok(None);
    };
    Atom::parse(MOOV, &data[header.payload()], None).map(Some)
}

/// The `ilst` under moov/udta/meta; missing levels yield `None`
fn with_ilst<T>(data: &[u8], read: impl FnOnce(&Atom) -> T) -> Result<Option<T>> {
    let Some(moov) = parse_moov(data)? else {
        debug!("MP4 file has no moov atom");
        return Ok(None);
    };
    Ok(moov.find_path(&[UDTA, META, ILST]).map(read))
}

/// Read tag values from the item list
pub fn read_tags(data: &[u8]) -> Result<TagValues> {
    let values = with_ilst(data, |list| {
        let mut values = TagValues::default();
        for item in list.children() {
            if item.kind == FieldMappings::MP4_FREEFORM {
                let name = ilst::freeform_name(item);
                if let (Some(name), Some((_, payload))) = (name, ilst::item_data(item)) {
                    if name.eq_ignore_ascii_case("ISRC") {
                        let isrc = String::from_utf8_lossy(payload);
                        apply_text(&mut values, StandardField::Isrc, &isrc);
                    }
                }
                continue;
            }

            let Some(field) = FieldMappings::from_mp4(&item.kind) else {
                continue;
            };
            let Some((data_type, payload)) = ilst::item_data(item) else {
                debug!(item = %fourcc_str(&item.kind), "item without data atom");
                continue;
            };
            match field {
                StandardField::TrackNumber => {
                    let (track, total) = ilst::parse_track_payload(payload);
                    values.track_number = values.track_number.or(track);
                    values.total_tracks = values.total_tracks.or(total);
                }
                StandardField::Cover => {}
                _ if data_type == DataType::Utf8 => {
                    apply_text(&mut values, field, &String::from_utf8_lossy(payload));
                }
                _ => {}
            }
        }
        values
    })?;
    Ok(values.unwrap_or_default())
}

/// First image of the `covr` item
pub fn read_cover(data: &[u8]) -> Result<Option<CoverArt>> {
    let cover = with_ilst(data, |list| {
        let item = list.child(FieldMappings::MP4_COVER)?;
        let (data_type, payload) = ilst::item_data(item)?;
        let format = match data_type {
            DataType::Jpeg => ImageFormat::Jpeg,
            DataType::Png => ImageFormat::Png,
            _ => ImageFormat::detect(payload),
        };
        let (width, height, _) = ImageFormat::dimensions(payload).unwrap_or((0, 0, 0));
        Some(CoverArt {
            mime_type: format.mime_type().to_string(),
            width,
            height,
            description: String::new(),
            data: payload.to_vec(),
        })
    })?;
    Ok(cover.flatten())
}
