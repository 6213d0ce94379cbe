// Track metadata passed in by callers and the partial tag values read back out

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Descriptive metadata for one track, as supplied by the download pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    /// Release date as delivered upstream: `2021-05-03`, an RFC 3339 timestamp, or a bare year
    pub release_date: Option<String>,
    pub copyright: Option<String>,
    pub isrc: Option<String>,
    /// Identifier handed to the `CoverArtProvider`
    pub cover_id: Option<String>,
}

impl TrackMetadata {
    /// Release year derived from `release_date`
    pub fn release_year(&self) -> Option<u32> {
        self.release_date.as_deref().and_then(parse_year)
    }
}

/// Extract a year from a date-like string
pub fn parse_year(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return u32::try_from(dt.year()).ok();
    }
    if let Some(prefix) = value.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return u32::try_from(date.year()).ok();
        }
    }
    // Bare or leading year, e.g. "2019" or "2019-04"
    let digits = value.get(..4)?;
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// Parse "3" or "3/12" into (track, total)
pub fn parse_track_pair(value: &str) -> (Option<u32>, Option<u32>) {
    let mut parts = value.splitn(2, '/');
    let track = parts.next().and_then(|t| t.trim().parse().ok());
    let total = parts.next().and_then(|t| t.trim().parse().ok());
    (track, total)
}

/// Tag values recovered from a file; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagValues {
    pub title: Option<String>,
    /// Artists in order of appearance, deduplicated
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub copyright: Option<String>,
    pub isrc: Option<String>,
}

impl TagValues {
    pub fn add_artist(&mut self, artist: &str) {
        let artist = artist.trim();
        if !artist.is_empty() && !self.artists.iter().any(|a| a == artist) {
            self.artists.push(artist.to_string());
        }
    }

    /// Fill every empty field from `other`
    pub fn fill_missing(&mut self, other: TagValues) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.title, other.title);
        fill(&mut self.album, other.album);
        fill(&mut self.album_artist, other.album_artist);
        fill(&mut self.year, other.year);
        fill(&mut self.track_number, other.track_number);
        fill(&mut self.total_tracks, other.total_tracks);
        fill(&mut self.copyright, other.copyright);
        fill(&mut self.isrc, other.isrc);
        if self.artists.is_empty() {
            self.artists = other.artists;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TagValues::default()
    }
}

/// Store a trimmed, non-empty value
pub(crate) fn non_empty(value: impl AsRef<str>) -> Option<String> {
    let value = value.as_ref().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Embedded cover image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverArt {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub description: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Resolves a cover identifier to image bytes.
///
/// Implementations usually wrap a network fetch that already completed; the engines
/// never perform I/O themselves.
pub trait CoverArtProvider: Send + Sync {
    fn resolve(&self, cover_id: &str) -> Option<Vec<u8>>;
}

/// Provider that never has artwork
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCoverArt;

impl CoverArtProvider for NoCoverArt {
    fn resolve(&self, _cover_id: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Provider returning the same, already fetched image for any id
#[derive(Debug, Clone, Default)]
pub struct StaticCoverArt(pub Vec<u8>);

impl CoverArtProvider for StaticCoverArt {
    fn resolve(&self, _cover_id: &str) -> Option<Vec<u8>> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

impl<F> CoverArtProvider for F
where
    F: Fn(&str) -> Option<Vec<u8>> + Send + Sync,
{
    fn resolve(&self, cover_id: &str) -> Option<Vec<u8>> {
        self(cover_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_year_from_various_dates() {
        assert_eq!(parse_year("2021-05-03"), Some(2021));
        assert_eq!(parse_year("2014-11-10T00:00:00+00:00"), Some(2014));
        assert_eq!(parse_year("1999"), Some(1999));
        assert_eq!(parse_year("2003-07"), Some(2003));
        assert_eq!(parse_year("May 2003"), None);
        assert_eq!(parse_year(""), None);

        let metadata = TrackMetadata {
            release_date: Some("1987-09-01".to_string()),
            ..TrackMetadata::default()
        };
        assert_eq!(metadata.release_year(), Some(1987));
    }

    #[test]
    fn track_pairs() {
        assert_eq!(parse_track_pair("3"), (Some(3), None));
        assert_eq!(parse_track_pair("3/12"), (Some(3), Some(12)));
        assert_eq!(parse_track_pair(" 4 / x"), (Some(4), None));
    }

    #[test]
    fn artists_are_deduplicated() {
        let mut values = TagValues::default();
        values.add_artist("A");
        values.add_artist(" A ");
        values.add_artist("");
        values.add_artist("B");
        assert_eq!(values.artists, vec!["A", "B"]);
    }

    #[test]
    fn fill_missing_keeps_existing_values() {
        let mut primary = TagValues {
            title: Some("Primary".to_string()),
            ..TagValues::default()
        };
        let mut fallback = TagValues {
            title: Some("Fallback".to_string()),
            album: Some("Album".to_string()),
            ..TagValues::default()
        };
        fallback.add_artist("Artist");
        primary.fill_missing(fallback);
        assert_eq!(primary.title.as_deref(), Some("Primary"));
        assert_eq!(primary.album.as_deref(), Some("Album"));
        assert_eq!(primary.artists, vec!["Artist"]);
    }

    #[test]
    fn metadata_deserializes_with_missing_fields() {
        let metadata: TrackMetadata =
            serde_json::from_str(r#"{"title": "A", "track_number": 2}"#).unwrap();
        assert_eq!(metadata.title.as_deref(), Some("A"));
        assert_eq!(metadata.track_number, Some(2));
        assert!(metadata.artist.is_none());
    }

    #[test]
    fn closure_provider() {
        let provider = |id: &str| if id == "x" { Some(vec![1u8]) } else { None };
        assert_eq!(provider.resolve("x"), Some(vec![1]));
        assert_eq!(provider.resolve("y"), None);
        assert_eq!(StaticCoverArt(Vec::new()).resolve("any"), None);
    }
}
