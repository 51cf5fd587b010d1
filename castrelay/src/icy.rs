//! In-band (ICY) metadata framing and interleaving.
//!
//! ICY metadata rides inside the audio byte stream: after every `metaint`
//! bytes of audio payload, one length-prefixed text block is spliced in.
//! Clients that requested metadata strip the blocks back out; everyone
//! else gets a channel with metadata disabled.

use bytes::Bytes;
use castplaylist::TrackDescriptor;

/// Default audio byte count between metadata blocks.
///
/// Declared once to the client out-of-band; it must stay constant for the
/// channel's lifetime, otherwise clients that latched onto the original
/// value lose the block boundaries.
pub const DEFAULT_METAINT: usize = 16_000;

/// The length field is a single byte counting 16-byte units.
const MAX_BLOCK_TEXT: usize = 16 * u8::MAX as usize;

/// Formats a track descriptor as one ICY metadata block.
///
/// ICY format: `StreamTitle='Title - Artist';` plus `StreamAlbum`,
/// `StreamYear` and `StreamUrl` (cover location) when the descriptor
/// carries them. Padded with zeros to a multiple of 16 bytes and prefixed
/// with one length byte (= padded length / 16).
pub fn frame_metadata(track: &TrackDescriptor) -> Bytes {
    let title = track.title.as_deref().unwrap_or("Unknown");
    let artist = track.artist.as_deref().unwrap_or("Unknown Artist");

    let mut metadata_str = format!("StreamTitle='{} - {}';", title, artist);
    if let Some(album) = &track.album {
        metadata_str.push_str(&format!("StreamAlbum='{}';", album));
    }
    if let Some(year) = track.year {
        metadata_str.push_str(&format!("StreamYear='{}';", year));
    }
    if let Some(cover) = &track.cover_uri {
        metadata_str.push_str(&format!("StreamUrl='{}';", cover));
    }

    let metadata_bytes = metadata_str.as_bytes();
    let length = metadata_bytes.len().min(MAX_BLOCK_TEXT);
    let padded_length = ((length + 15) / 16) * 16;
    let length_byte = (padded_length / 16) as u8;

    let mut result = Vec::with_capacity(1 + padded_length);
    result.push(length_byte);
    result.extend_from_slice(&metadata_bytes[..length]);
    result.resize(1 + padded_length, 0); // Pad with zeros

    Bytes::from(result)
}

/// Splices metadata blocks into the audio flow at a fixed cadence.
///
/// The audio byte counter is cumulative across track boundaries within
/// one relay session; a track change never resets the cadence.
#[derive(Debug)]
pub struct IcyInterleaver {
    metaint: usize,
    since_block: usize,
}

impl IcyInterleaver {
    pub fn new(metaint: usize) -> Self {
        Self {
            metaint: metaint.max(1),
            since_block: 0,
        }
    }

    pub fn metaint(&self) -> usize {
        self.metaint
    }

    /// Splits `chunk` into segments, inserting `metadata` after every
    /// `metaint` audio bytes. Audio slices are zero-copy views of `chunk`.
    pub fn interleave(&mut self, chunk: Bytes, metadata: &Bytes) -> Vec<Bytes> {
        let mut out = Vec::with_capacity(2);
        let mut offset = 0;

        while offset < chunk.len() {
            let until_block = self.metaint - self.since_block;
            let take = until_block.min(chunk.len() - offset);
            out.push(chunk.slice(offset..offset + take));
            offset += take;
            self.since_block += take;

            if self.since_block == self.metaint {
                out.push(metadata.clone());
                self.since_block = 0;
            }
        }

        out
    }
}
