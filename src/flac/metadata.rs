// FLAC metadata block chain

use std::ops::Range;

use tracing::debug;

use crate::error::{Result, TagError};
use crate::utils::{ByteCursor, ByteWriter};

/// FLAC file signature
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Reserved(u8),
    Invalid,
}

impl BlockType {
    pub fn from_byte(byte: u8) -> Self {
        match byte & 0x7F {
            0 => BlockType::StreamInfo,
            1 => BlockType::Padding,
            2 => BlockType::Application,
            3 => BlockType::SeekTable,
            4 => BlockType::VorbisComment,
            5 => BlockType::CueSheet,
            6 => BlockType::Picture,
            127 => BlockType::Invalid,
            other => BlockType::Reserved(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            BlockType::StreamInfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::CueSheet => 5,
            BlockType::Picture => 6,
            BlockType::Reserved(other) => other,
            BlockType::Invalid => 127,
        }
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    /// Payload length; 24 bits on the wire
    pub length: u32,
}

impl BlockHeader {
    pub const SIZE: usize = 4;

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let flags = cursor.read_u8()?;
        let length = cursor.read_be_u24()?;
        Ok(BlockHeader {
            is_last: flags & 0x80 != 0,
            block_type: BlockType::from_byte(flags),
            length,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let last = if self.is_last { 0x80 } else { 0x00 };
        writer.put_u8(last | self.block_type.to_byte());
        writer.put_be_u24(self.length)
    }
}

/// One block located inside the source buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    pub header: BlockHeader,
    pub payload: Range<usize>,
}

/// Parsed metadata chain; `audio_offset` is where the frames start
#[derive(Debug, Clone)]
pub struct BlockChain {
    pub blocks: Vec<BlockSpan>,
    pub audio_offset: usize,
}

impl BlockChain {
    /// Walk the block chain of a complete FLAC buffer.
    ///
    /// The chain must start with STREAMINFO, contain no type-127 block, stay within
    /// bounds, and end with a block flagged as last. A chain that runs off the end of
    /// the buffer without a last flag is rejected rather than guessed at.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let signature = cursor.read_bytes(FLAC_SIGNATURE.len())?;
        if signature != FLAC_SIGNATURE {
            return Err(TagError::UnsupportedFormat("missing fLaC signature".to_string()));
        }

        let mut blocks = Vec::new();
        loop {
            if cursor.is_empty() {
                return Err(TagError::malformed("metadata chain has no last block"));
            }
            let header = BlockHeader::read(&mut cursor)?;
            if header.block_type == BlockType::Invalid {
                return Err(TagError::malformed(format!(
                    "invalid block type 127 at offset {}",
                    cursor.position() - BlockHeader::SIZE
                )));
            }
            if blocks.is_empty() && header.block_type != BlockType::StreamInfo {
                return Err(TagError::malformed(format!(
                    "first block is {:?}, expected STREAMINFO",
                    header.block_type
                )));
            }

            let start = cursor.position();
            cursor.skip(header.length as usize)?;
            blocks.push(BlockSpan {
                header,
                payload: start..cursor.position(),
            });

            if header.is_last {
                break;
            }
        }

        debug!(blocks = blocks.len(), audio_offset = cursor.position(), "parsed FLAC metadata chain");
        Ok(BlockChain {
            blocks,
            audio_offset: cursor.position(),
        })
    }

    /// First block of the given type
    pub fn find(&self, block_type: BlockType) -> Option<&BlockSpan> {
        self.blocks.iter().find(|b| b.header.block_type == block_type)
    }
}

/// Serialize a full block (header and payload)
pub fn write_block(
    writer: &mut ByteWriter,
    block_type: BlockType,
    is_last: bool,
    payload: &[u8],
) -> Result<()> {
    let length = u32::try_from(payload.len())
        .map_err(|_| TagError::malformed("block payload larger than 4 GiB"))?;
    BlockHeader {
        is_last,
        block_type,
        length,
    }
    .write(writer)?;
    writer.put_bytes(payload);
    Ok(())
}
