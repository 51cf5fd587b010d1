//! Track descriptors as resolved from a playlist file.

use serde::{Deserialize, Serialize};

/// Immutable description of one track in a playlist.
///
/// The `uri` doubles as the track identity for play-history tracking, so it
/// is assumed unique within a playlist. All other fields are optional
/// display metadata carried into the in-band metadata blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Location of the audio bytes (http(s) URL, file URL or plain path).
    pub uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    /// Cover image location, forwarded to clients as `StreamUrl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_uri: Option<String>,
}

impl TrackDescriptor {
    /// Creates a descriptor with only a location, no display metadata.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
            artist: None,
            album: None,
            year: None,
            cover_uri: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_cover_uri(mut self, cover_uri: impl Into<String>) -> Self {
        self.cover_uri = Some(cover_uri.into());
        self
    }
}
