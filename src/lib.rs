//! oxitag - in-memory metadata tagging for FLAC and MP4, plus tag reading for MP3.
//!
//! Every entry point here is fail-soft: writes hand back the original bytes when a
//! container cannot be rebuilt, reads fall back to default metadata.
//!
//! ```no_run
//! use oxitag::{Tagger, TrackMetadata, NoCoverArt};
//!
//! let audio = std::fs::read("track.flac").unwrap();
//! let metadata = TrackMetadata {
//!     title: Some("Song".to_string()),
//!     artist: Some("Artist".to_string()),
//!     ..TrackMetadata::default()
//! };
//! let tagged = Tagger::default().add_metadata_to_audio(&audio, &metadata, &NoCoverArt, None);
//! ```

pub mod config;
pub mod error;
pub mod field_mapping;
pub mod flac;
pub mod format;
pub mod id3;
pub mod metadata;
pub mod mp4;
pub mod utils;

use std::path::Path;

use tracing::{debug, warn};

pub use config::TagOptions;
pub use error::{Result, TagError};
pub use format::{AudioFormat, ImageFormat};
pub use metadata::{CoverArt, CoverArtProvider, NoCoverArt, StaticCoverArt, TagValues, TrackMetadata};

/// Artist reported when a file carries none
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
/// Album reported when a file carries none
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Dispatches buffers to the container engines
#[derive(Debug, Clone, Default)]
pub struct Tagger {
    options: TagOptions,
}

impl Tagger {
    pub fn new(options: TagOptions) -> Self {
        Tagger { options }
    }

    pub fn options(&self) -> &TagOptions {
        &self.options
    }

    /// Embed `metadata` (and cover art from `provider`) into `audio`.
    ///
    /// The container is sniffed from the bytes; `quality_hint` (a MIME type or a
    /// quality label such as `LOSSLESS`) is only consulted when the bytes are not
    /// recognized. Any failure returns a copy of `audio`.
    pub fn add_metadata_to_audio(
        &self,
        audio: &[u8],
        metadata: &TrackMetadata,
        provider: &dyn CoverArtProvider,
        quality_hint: Option<&str>,
    ) -> Vec<u8> {
        let format = AudioFormat::detect(audio, quality_hint);
        let cover = match self.resolve_cover(metadata, provider) {
            Ok(cover) => cover,
            Err(e) => {
                warn!(error = %e, "continuing without cover art");
                None
            }
        };

        match self.try_write(format, audio, metadata, cover.as_deref()) {
            Ok(tagged) => tagged,
            Err(TagError::UnsupportedFormat(reason)) => {
                debug!(%format, %reason, "passing audio through untagged");
                audio.to_vec()
            }
            Err(e) => {
                warn!(%format, error = %e, "tagging failed, returning original audio");
                audio.to_vec()
            }
        }
    }

    /// Fetch artwork for `metadata.cover_id`; `Ok(None)` when there is nothing to fetch
    fn resolve_cover(
        &self,
        metadata: &TrackMetadata,
        provider: &dyn CoverArtProvider,
    ) -> Result<Option<Vec<u8>>> {
        if !self.options.embed_cover {
            return Ok(None);
        }
        let Some(cover_id) = metadata.cover_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        match provider.resolve(cover_id) {
            Some(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
            _ => Err(TagError::ArtworkUnavailable(cover_id.to_string())),
        }
    }

    fn try_write(
        &self,
        format: AudioFormat,
        audio: &[u8],
        metadata: &TrackMetadata,
        cover: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        match format {
            AudioFormat::Flac => flac::write_tags(audio, metadata, cover, &self.options),
            AudioFormat::Mp4 => mp4::write_tags(audio, metadata, cover, &self.options),
            AudioFormat::Mp3 => Err(TagError::UnsupportedFormat("MP3 tags are read-only".to_string())),
            AudioFormat::Unknown => Err(TagError::UnsupportedFormat("unrecognized container".to_string())),
        }
    }

    /// Tag values found in `bytes`, or `None` when nothing could be read
    pub fn read_tag_values(&self, bytes: &[u8], filename: &str) -> Option<TagValues> {
        let format = AudioFormat::detect(bytes, None);
        let format = if format == AudioFormat::Unknown {
            AudioFormat::from_filename(filename)
        } else {
            format
        };

        let result = match format {
            AudioFormat::Flac => flac::read_tags(bytes),
            AudioFormat::Mp4 => mp4::read_tags(bytes),
            AudioFormat::Mp3 => id3::read_tags(bytes),
            AudioFormat::Unknown => return None,
        };
        match result {
            Ok(values) => Some(values),
            Err(e) => {
                warn!(filename, %format, error = %e, "could not read tags");
                None
            }
        }
    }

    /// Read metadata from a local file's bytes.
    ///
    /// Missing fields fall back to the filename stem, "Unknown Artist" and
    /// "Unknown Album". Several artists are joined with ", ".
    pub fn read_track_metadata(&self, bytes: &[u8], filename: &str) -> TrackMetadata {
        let values = self.read_tag_values(bytes, filename).unwrap_or_default();

        let artist = if values.artists.is_empty() {
            values.album_artist.clone()
        } else {
            Some(values.artists.join(", "))
        };

        TrackMetadata {
            title: Some(values.title.unwrap_or_else(|| filename_stem(filename))),
            artist: Some(artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string())),
            album: Some(values.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string())),
            album_artist: values.album_artist,
            track_number: values.track_number,
            total_tracks: values.total_tracks,
            release_date: values.year.map(|year| year.to_string()),
            copyright: values.copyright,
            isrc: values.isrc,
            cover_id: None,
        }
    }

    /// Embedded cover art, if any
    pub fn read_cover_art(&self, bytes: &[u8]) -> Option<CoverArt> {
        let format = AudioFormat::detect(bytes, None);
        let result = match format {
            AudioFormat::Flac => flac::read_cover(bytes),
            AudioFormat::Mp4 => mp4::read_cover(bytes),
            AudioFormat::Mp3 => id3::read_cover(bytes),
            AudioFormat::Unknown => return None,
        };
        result.unwrap_or_else(|e| {
            warn!(%format, error = %e, "could not read cover art");
            None
        })
    }
}

/// File name without directories and extension
fn filename_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| filename.to_string())
}

/// `Tagger::add_metadata_to_audio` with default options
pub fn add_metadata_to_audio(
    audio: &[u8],
    metadata: &TrackMetadata,
    provider: &dyn CoverArtProvider,
    quality_hint: Option<&str>,
) -> Vec<u8> {
    Tagger::default().add_metadata_to_audio(audio, metadata, provider, quality_hint)
}

/// `Tagger::read_track_metadata` with default options
pub fn read_track_metadata(bytes: &[u8], filename: &str) -> TrackMetadata {
    Tagger::default().read_track_metadata(bytes, filename)
}

pub fn read_cover_art(bytes: &[u8]) -> Option<CoverArt> {
    Tagger::default().read_cover_art(bytes)
}

/// Tag a FLAC buffer; the input comes back unchanged on failure
pub fn write_flac_tags(audio: &[u8], metadata: &TrackMetadata, cover: Option<&[u8]>) -> Vec<u8> {
    flac::write_tags(audio, metadata, cover, &TagOptions::default()).unwrap_or_else(|e| {
        warn!(error = %e, "FLAC tagging failed, returning original audio");
        audio.to_vec()
    })
}

/// Tag an MP4 buffer; the input comes back unchanged on failure
pub fn write_mp4_tags(audio: &[u8], metadata: &TrackMetadata, cover: Option<&[u8]>) -> Vec<u8> {
    mp4::write_tags(audio, metadata, cover, &TagOptions::default()).unwrap_or_else(|e| {
        warn!(error = %e, "MP4 tagging failed, returning original audio");
        audio.to_vec()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_flac() -> Vec<u8> {
        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x80, 0, 0, 34]);
        data.extend_from_slice(&[0x11; 34]);
        data.extend_from_slice(&[0xFF, 0xF8, 0x01, 0x02]);
        data
    }

    #[test]
    fn stem_strips_directories_and_extension() {
        assert_eq!(filename_stem("music/Artist - Song.flac"), "Artist - Song");
        assert_eq!(filename_stem("noext"), "noext");
    }

    #[test]
    fn missing_artwork_does_not_block_tagging() {
        let metadata = TrackMetadata {
            title: Some("A".to_string()),
            cover_id: Some("abc".to_string()),
            ..TrackMetadata::default()
        };
        let audio = minimal_flac();
        let tagged = Tagger::default().add_metadata_to_audio(&audio, &metadata, &NoCoverArt, None);
        assert_ne!(tagged, audio);
        assert_eq!(flac::read_tags(&tagged).unwrap().title.as_deref(), Some("A"));
        assert!(flac::read_cover(&tagged).unwrap().is_none());
    }

    #[test]
    fn provider_receives_cover_id() {
        let metadata = TrackMetadata {
            cover_id: Some("cover-42".to_string()),
            ..TrackMetadata::default()
        };
        let provider = |id: &str| (id == "cover-42").then(|| vec![0xFF, 0xD8, 0xFF, 0xE0]);
        let tagged = Tagger::default().add_metadata_to_audio(&minimal_flac(), &metadata, &provider, None);
        let cover = flac::read_cover(&tagged).unwrap().unwrap();
        assert_eq!(cover.mime_type, "image/jpeg");
    }

    #[test]
    fn cover_embedding_can_be_disabled() {
        let tagger = Tagger::new(TagOptions {
            embed_cover: false,
            ..TagOptions::default()
        });
        let metadata = TrackMetadata {
            cover_id: Some("x".to_string()),
            ..TrackMetadata::default()
        };
        let provider = StaticCoverArt(vec![0xFF, 0xD8, 0xFF]);
        let tagged = tagger.add_metadata_to_audio(&minimal_flac(), &metadata, &provider, None);
        assert!(flac::read_cover(&tagged).unwrap().is_none());
    }

    #[test]
    fn mp3_and_unknown_pass_through() {
        let metadata = TrackMetadata::default();
        let mp3 = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        assert_eq!(add_metadata_to_audio(&mp3, &metadata, &NoCoverArt, Some("LOSSLESS")), mp3);
        let junk = vec![1u8, 2, 3];
        assert_eq!(add_metadata_to_audio(&junk, &metadata, &NoCoverArt, None), junk);
    }

    #[test]
    fn multiple_artists_are_joined() {
        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x00, 0, 0, 34]);
        data.extend_from_slice(&[0x11; 34]);
        let mut comment = flac::VorbisComment::new("v");
        comment.comments.push(("ARTIST".to_string(), "One".to_string()));
        comment.comments.push(("ARTIST".to_string(), "Two".to_string()));
        let payload = comment.to_bytes();
        data.push(0x84);
        data.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
        data.extend(payload);

        let metadata = read_track_metadata(&data, "x.flac");
        assert_eq!(metadata.artist.as_deref(), Some("One, Two"));
        assert_eq!(metadata.title.as_deref(), Some("x"));
        assert_eq!(metadata.album.as_deref(), Some(UNKNOWN_ALBUM));
    }
}
