// MP4 atom (box) parsing and serialization
//
// Top-level atoms are only located (`scan`), never copied, so `mdat` stays a byte
// range of the input. `moov` is parsed into an `Atom` tree that can be edited and
// written back.

use std::ops::Range;

use tracing::debug;

use crate::error::{Result, TagError};
use crate::utils::{ByteCursor, ByteWriter};

/// Four-character atom type
pub type FourCC = [u8; 4];

pub const MOOV: FourCC = *b"moov";
pub const MDAT: FourCC = *b"mdat";
pub const MOOF: FourCC = *b"moof";
pub const TRAK: FourCC = *b"trak";
pub const MDIA: FourCC = *b"mdia";
pub const MINF: FourCC = *b"minf";
pub const STBL: FourCC = *b"stbl";
pub const EDTS: FourCC = *b"edts";
pub const DINF: FourCC = *b"dinf";
pub const STCO: FourCC = *b"stco";
pub const CO64: FourCC = *b"co64";
pub const UDTA: FourCC = *b"udta";
pub const META: FourCC = *b"meta";
pub const HDLR: FourCC = *b"hdlr";
pub const ILST: FourCC = *b"ilst";
pub const DATA: FourCC = *b"data";
pub const MEAN: FourCC = *b"mean";
pub const NAME: FourCC = *b"name";

/// Containers on the sample-table path; their children must parse exactly
const STRICT_CONTAINERS: [FourCC; 7] = [MOOV, TRAK, MDIA, MINF, STBL, EDTS, DINF];

/// Metadata containers; unparseable content is kept as an opaque leaf
const LENIENT_CONTAINERS: [FourCC; 2] = [UDTA, ILST];

/// QuickTime ends some `udta` lists with a 32-bit zero instead of another atom
const TERMINATOR: [u8; 4] = [0; 4];

const HEADER_SIZE: u64 = 8;
const EXTENDED_HEADER_SIZE: u64 = 16;

/// Printable form of an atom type, e.g. "©nam"
pub fn fourcc_str(kind: &FourCC) -> String {
    kind.iter().map(|&b| b as char).collect()
}

/// Atom header located inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomHeader {
    pub kind: FourCC,
    /// Offset of the first header byte
    pub offset: usize,
    pub header_len: usize,
    /// Total size including the header, with size 0 resolved to the buffer end
    pub size: u64,
}

impl AtomHeader {
    /// Read a header at the cursor position and validate it against the buffer.
    ///
    /// `size == 1` selects the 64-bit extended size; `size == 0` ("to end of file")
    /// is only accepted when `allow_to_end` is set.
    pub fn read(cursor: &mut ByteCursor<'_>, allow_to_end: bool) -> Result<Self> {
        let offset = cursor.position();
        let size32 = cursor.read_be_u32()?;
        let kind = cursor.read_fourcc()?;

        let (size, header_len) = match size32 {
            0 if allow_to_end => ((cursor.len() - offset) as u64, HEADER_SIZE),
            0 => {
                return Err(TagError::malformed(format!(
                    "nested atom '{}' with size 0",
                    fourcc_str(&kind)
                )))
            }
            1 => (cursor.read_be_u64()?, EXTENDED_HEADER_SIZE),
            n => (n as u64, HEADER_SIZE),
        };

        if size < header_len {
            return Err(TagError::malformed(format!(
                "atom '{}' at {} declares size {} smaller than its header",
                fourcc_str(&kind),
                offset,
                size
            )));
        }
        let available = (cursor.len() - offset) as u64;
        if size > available {
            return Err(TagError::TruncatedData {
                offset,
                needed: usize::try_from(size).unwrap_or(usize::MAX),
                available: available as usize,
            });
        }

        Ok(AtomHeader {
            kind,
            offset,
            header_len: header_len as usize,
            size,
        })
    }

    pub fn end(&self) -> usize {
        self.offset + self.size as usize
    }

    pub fn payload(&self) -> Range<usize> {
        self.offset + self.header_len..self.end()
    }
}

/// Locate every top-level atom of a file
pub fn scan(data: &[u8]) -> Result<Vec<AtomHeader>> {
    let mut cursor = ByteCursor::new(data);
    let mut atoms = Vec::new();
    // A few trailing bytes too short for a header are tolerated and copied as-is
    while cursor.remaining() >= HEADER_SIZE as usize {
        let header = AtomHeader::read(&mut cursor, true)?;
        cursor.seek(header.end())?;
        atoms.push(header);
    }
    Ok(atoms)
}

/// Atom payload: raw bytes or child atoms
#[derive(Debug, Clone, PartialEq)]
pub enum AtomBody {
    Leaf(Vec<u8>),
    /// `prefix` holds bytes before the first child, e.g. the version/flags of `meta`;
    /// `suffix` holds a trailing zero terminator
    Container {
        prefix: Vec<u8>,
        children: Vec<Atom>,
        suffix: Vec<u8>,
    },
}

/// One node of a parsed atom tree
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub kind: FourCC,
    pub body: AtomBody,
}

impl Atom {
    pub fn leaf(kind: FourCC, payload: Vec<u8>) -> Self {
        Atom {
            kind,
            body: AtomBody::Leaf(payload),
        }
    }

    pub fn container(kind: FourCC, children: Vec<Atom>) -> Self {
        Atom::full_container(kind, Vec::new(), children)
    }

    pub fn full_container(kind: FourCC, prefix: Vec<u8>, children: Vec<Atom>) -> Self {
        Atom {
            kind,
            body: AtomBody::Container {
                prefix,
                children,
                suffix: Vec::new(),
            },
        }
    }

    /// Parse an atom of type `kind` from its payload.
    ///
    /// `parent` decides whether an unknown type is a container: every child of `ilst`
    /// is an item container holding `data` atoms.
    pub fn parse(kind: FourCC, payload: &[u8], parent: Option<FourCC>) -> Result<Self> {
        if STRICT_CONTAINERS.contains(&kind) {
            let children = Self::parse_children(payload, kind)?;
            return Ok(Atom::container(kind, children));
        }

        if kind == META {
            // ISO full box: version/flags precede the children. QuickTime omits them.
            let prefix_len = if payload.get(8..12) == Some(&HDLR[..]) {
                4
            } else if payload.get(4..8) == Some(&HDLR[..]) {
                0
            } else {
                return Ok(Atom::leaf(kind, payload.to_vec()));
            };
            return Ok(Self::parse_lenient(kind, payload, prefix_len));
        }

        if LENIENT_CONTAINERS.contains(&kind) || parent == Some(ILST) {
            return Ok(Self::parse_lenient(kind, payload, 0));
        }

        Ok(Atom::leaf(kind, payload.to_vec()))
    }

    /// Container parse that never fails: a trailing zero terminator is kept as the
    /// suffix, anything else unparseable becomes an opaque leaf
    fn parse_lenient(kind: FourCC, payload: &[u8], prefix_len: usize) -> Atom {
        let prefix = &payload[..prefix_len];
        let body = &payload[prefix_len..];
        let (children, suffix) = match Self::parse_children(body, kind) {
            Ok(children) => (children, &[][..]),
            Err(e) => {
                let terminated = body
                    .strip_suffix(&TERMINATOR[..])
                    .and_then(|head| Self::parse_children(head, kind).ok());
                match terminated {
                    Some(children) => (children, &TERMINATOR[..]),
                    None => {
                        debug!(atom = %fourcc_str(&kind), error = %e, "keeping atom opaque");
                        return Atom::leaf(kind, payload.to_vec());
                    }
                }
            }
        };
        Atom {
            kind,
            body: AtomBody::Container {
                prefix: prefix.to_vec(),
                children,
                suffix: suffix.to_vec(),
            },
        }
    }

    /// Parse a run of sibling atoms that must exactly fill `data`
    pub fn parse_children(data: &[u8], parent: FourCC) -> Result<Vec<Atom>> {
        let mut cursor = ByteCursor::new(data);
        let mut children = Vec::new();
        while !cursor.is_empty() {
            let header = AtomHeader::read(&mut cursor, false)?;
            let child = Atom::parse(header.kind, &data[header.payload()], Some(parent))?;
            cursor.seek(header.end())?;
            children.push(child);
        }
        Ok(children)
    }

    /// Payload length in bytes (everything after the header)
    pub fn payload_len(&self) -> u64 {
        match &self.body {
            AtomBody::Leaf(payload) => payload.len() as u64,
            AtomBody::Container {
                prefix,
                children,
                suffix,
            } => {
                prefix.len() as u64
                    + children.iter().map(Atom::size).sum::<u64>()
                    + suffix.len() as u64
            }
        }
    }

    /// Serialized size; the extended header is only used when 32 bits do not suffice
    pub fn size(&self) -> u64 {
        let payload = self.payload_len();
        if HEADER_SIZE + payload > u32::MAX as u64 {
            EXTENDED_HEADER_SIZE + payload
        } else {
            HEADER_SIZE + payload
        }
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        let size = self.size();
        match u32::try_from(size) {
            Ok(size) => {
                writer.put_be_u32(size);
                writer.put_bytes(&self.kind);
            }
            Err(_) => {
                writer.put_be_u32(1);
                writer.put_bytes(&self.kind);
                writer.put_be_u64(size);
            }
        }
        match &self.body {
            AtomBody::Leaf(payload) => writer.put_bytes(payload),
            AtomBody::Container {
                prefix,
                children,
                suffix,
            } => {
                writer.put_bytes(prefix);
                for child in children {
                    child.write(writer);
                }
                writer.put_bytes(suffix);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(self.size() as usize);
        self.write(&mut writer);
        writer.into_inner()
    }

    pub fn children(&self) -> &[Atom] {
        match &self.body {
            AtomBody::Container { children, .. } => children,
            AtomBody::Leaf(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Atom>> {
        match &mut self.body {
            AtomBody::Container { children, .. } => Some(children),
            AtomBody::Leaf(_) => None,
        }
    }

    pub fn child(&self, kind: FourCC) -> Option<&Atom> {
        self.children().iter().find(|c| c.kind == kind)
    }

    /// Follow a chain of child types, e.g. `[UDTA, META, ILST]` from `moov`
    pub fn find_path(&self, path: &[FourCC]) -> Option<&Atom> {
        path.iter().try_fold(self, |atom, &kind| atom.child(kind))
    }

    pub fn leaf_data(&self) -> Option<&[u8]> {
        match &self.body {
            AtomBody::Leaf(payload) => Some(payload),
            AtomBody::Container { .. } => None,
        }
    }

    /// Visit this atom and every descendant depth-first.
    ///
    /// The visitor receives the types of the ancestors (outermost first), not
    /// including the atom itself.
    pub fn walk_mut<F>(&mut self, visit: &mut F) -> Result<()>
    where
        F: FnMut(&[FourCC], &mut Atom) -> Result<()>,
    {
        let mut path = Vec::new();
        self.walk_inner(&mut path, visit)
    }

    fn walk_inner<F>(&mut self, path: &mut Vec<FourCC>, visit: &mut F) -> Result<()>
    where
        F: FnMut(&[FourCC], &mut Atom) -> Result<()>,
    {
        visit(path, self)?;
        let kind = self.kind;
        if let AtomBody::Container { children, .. } = &mut self.body {
            path.push(kind);
            for child in children.iter_mut() {
                child.walk_inner(path, visit)?;
            }
            path.pop();
        }
        Ok(())
    }
}
