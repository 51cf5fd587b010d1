//! CastRadio — playlist-to-radio relay runner.
//!
//! Reads a YAML station file, starts one channel per station and writes
//! each channel's continuous byte stream to its configured output. Any
//! HTTP frontend lives elsewhere; this binary is the engine shell.
//!
//! ```yaml
//! # castradio.yaml
//! media_root: ./media          # optional, resolves bare playlist paths
//! stations:
//!   - name: morning
//!     playlist: playlists/morning.json
//!     policy: shuffle_no_immediate_repeat
//!     output: /tmp/morning.stream
//!     relay:
//!       metaint: 16000
//! ```
//!
//! Playlist files carry either full descriptors (`{"tracks": [...]}`) or
//! the legacy `{"mp3_files": [...]}` listing.

use anyhow::{Context, Result};
use castchannel::{ChannelId, ChannelRegistry};
use castplaylist::{OrderingPolicy, Playlist};
use castrelay::{FileSink, RelayConfig};
use castsource::UriTrackSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct AppConfig {
    /// Resolves bare relative track paths when set.
    #[serde(default)]
    media_root: Option<PathBuf>,
    stations: Vec<StationConfig>,
}

#[derive(Debug, Deserialize)]
struct StationConfig {
    name: String,
    playlist: PathBuf,
    #[serde(default)]
    policy: OrderingPolicy,
    output: PathBuf,
    #[serde(default)]
    relay: RelayConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "castradio.yaml".to_string());
    let config = load_config(Path::new(&config_path))?;
    if config.stations.is_empty() {
        anyhow::bail!("no stations configured in {config_path}");
    }

    let source = match &config.media_root {
        Some(root) => Arc::new(UriTrackSource::with_root(root)),
        None => Arc::new(UriTrackSource::new()),
    };
    let registry = ChannelRegistry::new(source);

    info!("📻 Starting {} station(s)...", config.stations.len());
    for station in &config.stations {
        match start_station(&registry, station).await {
            Ok(id) => info!(channel = %id, station = %station.name, "✅ Station on air"),
            Err(e) => warn!(station = %station.name, "⚠️ Failed to start station: {e:#}"),
        }
    }
    if registry.is_empty() {
        anyhow::bail!("no station could be started");
    }

    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    for id in registry.list() {
        if let Err(e) = registry.stop(id) {
            warn!(channel = %id, "Stop failed: {e}");
        }
    }
    info!("✅ CastRadio shut down");
    Ok(())
}

async fn start_station(registry: &ChannelRegistry, station: &StationConfig) -> Result<ChannelId> {
    let bytes = tokio::fs::read(&station.playlist)
        .await
        .with_context(|| format!("reading playlist {}", station.playlist.display()))?;
    let playlist = Playlist::from_json_slice(&bytes)
        .with_context(|| format!("parsing playlist {}", station.playlist.display()))?;

    let id = registry.create_with_config(
        playlist.tracks().to_vec(),
        station.policy,
        station.relay.clone(),
    )?;

    let sink = FileSink::create(&station.output)
        .await
        .with_context(|| format!("creating output {}", station.output.display()))?;
    registry.attach(id, Box::new(sink))?;

    Ok(id)
}

fn load_config(path: &Path) -> Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("parsing configuration {}", path.display()))
}
