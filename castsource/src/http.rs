//! Remote track opener backed by reqwest.

use crate::{OpenError, Result, TrackSource, TrackStream};
use async_trait::async_trait;
use futures::StreamExt;
use std::io;
use tracing::debug;
use url::Url;

/// Opens remote tracks over HTTP(S) and exposes the response body as a
/// byte stream.
///
/// The client is shared across calls; reqwest pools connections
/// internally, so cloning this source is cheap.
#[derive(Debug, Clone)]
pub struct HttpTrackSource {
    client: reqwest::Client,
}

impl HttpTrackSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Uses a preconfigured client (custom timeouts, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTrackSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackSource for HttpTrackSource {
    async fn open(&self, uri: &str) -> Result<TrackStream> {
        let url = Url::parse(uri)?;
        debug!("Opening remote track: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OpenError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        // Surface transport errors through the stream as io errors; the
        // relay treats them as mid-track stream failures.
        let stream = response.bytes_stream().map(|res| res.map_err(io::Error::other));

        Ok(TrackStream::new(stream))
    }
}
