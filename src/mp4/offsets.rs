// Chunk offset tables (stco / co64)
//
// Entries are absolute file offsets into `mdat`. When everything in front of `mdat`
// grows or shrinks by `delta`, every entry has to move by exactly `delta`.

use tracing::debug;

use crate::error::{Result, TagError};
use crate::mp4::atom::{fourcc_str, Atom, AtomBody, FourCC, CO64, MDIA, MINF, STBL, STCO, TRAK};
use crate::utils::{ByteCursor, ByteWriter};

/// Ancestors a chunk offset table must sit under
const SAMPLE_TABLE_PATH: [FourCC; 4] = [TRAK, MDIA, MINF, STBL];

/// Shift every `stco`/`co64` entry under `trak/mdia/minf/stbl` by `delta`.
///
/// Returns the number of entries rewritten. An entry that would leave the range of
/// its table's integer width is an error, never a wrap.
pub fn shift_chunk_offsets(moov: &mut Atom, delta: i64) -> Result<usize> {
    let mut patched = 0;
    moov.walk_mut(&mut |path: &[FourCC], atom: &mut Atom| -> Result<()> {
        if !path.ends_with(&SAMPLE_TABLE_PATH) || !(atom.kind == STCO || atom.kind == CO64) {
            return Ok(());
        }
        let kind = atom.kind;
        if let AtomBody::Leaf(payload) = &mut atom.body {
            let (rewritten, count) = shift_table(kind, payload, delta)?;
            *payload = rewritten;
            patched += count;
        }
        Ok(())
    })?;
    debug!(entries = patched, delta, "shifted chunk offsets");
    Ok(patched)
}

/// Rewrite one table payload: version/flags, entry count, entries
fn shift_table(kind: FourCC, payload: &[u8], delta: i64) -> Result<(Vec<u8>, usize)> {
    let mut cursor = ByteCursor::new(payload);
    let version_flags = cursor.read_bytes(4)?;
    let count = cursor.read_be_u32()? as usize;
    let width = if kind == CO64 { 8 } else { 4 };
    if count.checked_mul(width).map_or(true, |n| n > cursor.remaining()) {
        return Err(TagError::malformed(format!(
            "'{}' declares {} entries but holds {} bytes",
            fourcc_str(&kind),
            count,
            cursor.remaining()
        )));
    }

    let mut writer = ByteWriter::with_capacity(payload.len());
    writer.put_bytes(version_flags);
    writer.put_be_u32(count as u32);
    for _ in 0..count {
        if kind == CO64 {
            let offset = cursor.read_be_u64()?;
            writer.put_be_u64(shift(offset, delta)?);
        } else {
            let offset = cursor.read_be_u32()? as u64;
            let shifted = u32::try_from(shift(offset, delta)?).map_err(|_| {
                TagError::malformed(format!("stco entry {} + {} overflows 32 bits", offset, delta))
            })?;
            writer.put_be_u32(shifted);
        }
    }
    // keep any trailing bytes the table carried
    writer.put_bytes(cursor.rest());
    Ok((writer.into_inner(), count))
}

fn shift(offset: u64, delta: i64) -> Result<u64> {
    offset
        .checked_add_signed(delta)
        .ok_or_else(|| TagError::malformed(format!("chunk offset {} + {} out of range", offset, delta)))
}

/// Decode a table payload into absolute offsets
pub fn read_offsets(kind: FourCC, payload: &[u8]) -> Result<Vec<u64>> {
    let mut cursor = ByteCursor::new(payload);
    cursor.skip(4)?;
    let count = cursor.read_be_u32()?;
    (0..count)
        .map(|_| {
            if kind == CO64 {
                cursor.read_be_u64()
            } else {
                cursor.read_be_u32().map(u64::from)
            }
        })
        .collect()
}
