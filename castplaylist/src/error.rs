//! Types d'erreurs pour castplaylist

/// Erreurs de construction et de lecture de playlist
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Playlist is empty")]
    EmptyPlaylist,

    #[error("Invalid track at index {0}: missing uri")]
    InvalidTrack(usize),

    #[error("Invalid playlist file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Type Result spécialisé pour castplaylist
pub type Result<T> = std::result::Result<T, Error>;
