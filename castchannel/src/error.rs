//! Types d'erreurs pour castchannel

use crate::channel::ChannelId;

/// Erreurs des opérations du registre de canaux
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error(transparent)]
    Playlist(#[from] castplaylist::Error),
}

/// Type Result spécialisé pour castchannel
pub type Result<T> = std::result::Result<T, Error>;
