//! Non-empty, immutable track sequences.

use crate::error::{Error, Result};
use crate::track::TrackDescriptor;
use serde::Deserialize;

/// An ordered, non-empty sequence of tracks.
///
/// A playlist is validated once at construction and never mutated
/// afterwards; schedulers index into it freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<TrackDescriptor>,
}

/// Accepted on-disk playlist shapes.
///
/// Either the full descriptor form, or the legacy generator output that
/// only lists file locations under `mp3_files`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlaylistFile {
    Tracks { tracks: Vec<TrackDescriptor> },
    Mp3Files { mp3_files: Vec<String> },
}

impl Playlist {
    /// Builds a playlist, rejecting empty sequences and blank URIs.
    pub fn new(tracks: Vec<TrackDescriptor>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        if let Some(idx) = tracks.iter().position(|t| t.uri.trim().is_empty()) {
            return Err(Error::InvalidTrack(idx));
        }
        Ok(Self { tracks })
    }

    /// Parses a playlist file from JSON bytes.
    ///
    /// Accepts both `{"tracks": [{...}]}` and the legacy
    /// `{"mp3_files": ["..."]}` generator output.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let file: PlaylistFile = serde_json::from_slice(bytes)?;
        let tracks = match file {
            PlaylistFile::Tracks { tracks } => tracks,
            PlaylistFile::Mp3Files { mp3_files } => {
                mp3_files.into_iter().map(TrackDescriptor::new).collect()
            }
        };
        tracing::debug!(tracks = tracks.len(), "Playlist file parsed");
        Self::new(tracks)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Always false; empty playlists cannot be constructed.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&TrackDescriptor> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter()
    }
}
