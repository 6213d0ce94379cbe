// Text encodings used by ID3v2 frames

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Text encoding selected by the first byte of an ID3v2 text payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Iso8859_1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16BE,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Iso8859_1,
        }
    }

    /// Width of the string terminator in this encoding
    pub fn terminator_len(self) -> usize {
        match self {
            TextEncoding::Utf16 | TextEncoding::Utf16BE => 2,
            TextEncoding::Iso8859_1 | TextEncoding::Utf8 => 1,
        }
    }
}

/// Decode text with specified encoding
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        // ISO-8859-1 is decoded as its windows-1252 superset, as browsers do
        TextEncoding::Iso8859_1 => WINDOWS_1252.decode(data).0.into_owned(),
        TextEncoding::Utf16 => {
            if data.len() < 2 {
                return String::new();
            }
            match &data[0..2] {
                [0xFF, 0xFE] => UTF_16LE.decode_without_bom_handling(&data[2..]).0.into_owned(),
                [0xFE, 0xFF] => UTF_16BE.decode_without_bom_handling(&data[2..]).0.into_owned(),
                _ => UTF_16LE.decode_without_bom_handling(data).0.into_owned(),
            }
        }
        TextEncoding::Utf16BE => UTF_16BE.decode_without_bom_handling(data).0.into_owned(),
        TextEncoding::Utf8 => UTF_8.decode_without_bom_handling(data).0.into_owned(),
    }
}

/// Split `data` at the first terminator for `encoding`.
///
/// Returns the text bytes and whatever follows the terminator. UTF-16 terminators
/// are only matched on even offsets.
pub fn split_terminated(data: &[u8], encoding: TextEncoding) -> (&[u8], &[u8]) {
    let width = encoding.terminator_len();
    let mut pos = 0;
    while pos + width <= data.len() {
        if data[pos..pos + width].iter().all(|&b| b == 0) {
            return (&data[..pos], &data[pos + width..]);
        }
        pos += width;
    }
    (data, &[])
}

/// Decode an ID3v2 text frame payload (encoding byte followed by text).
///
/// v2.4 frames may hold several null-separated values; only the first is kept.
pub fn decode_text_frame(data: &[u8]) -> String {
    let Some((&first, text)) = data.split_first() else {
        return String::new();
    };
    let encoding = TextEncoding::from_byte(first);
    let (value, _) = split_terminated(text, encoding);
    decode_text(value, encoding).trim().to_string()
}
