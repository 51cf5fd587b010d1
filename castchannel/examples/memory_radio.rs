//! Minimal in-memory radio: three fake tracks, two listeners.
//!
//! Run with: cargo run -p castchannel --example memory_radio

use castchannel::ChannelRegistry;
use castplaylist::{OrderingPolicy, TrackDescriptor};
use castrelay::ChannelSink;
use castsource::MemoryTrackSource;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let source = Arc::new(
        MemoryTrackSource::new()
            .with_chunk_size(512)
            .with_track("mem://one", vec![1u8; 4096])
            .with_track("mem://two", vec![2u8; 4096])
            .with_track("mem://three", vec![3u8; 4096]),
    );
    let registry = ChannelRegistry::new(source);

    let id = registry.create(
        vec![
            TrackDescriptor::new("mem://one").with_title("One"),
            TrackDescriptor::new("mem://two").with_title("Two"),
            TrackDescriptor::new("mem://three").with_title("Three"),
        ],
        OrderingPolicy::ShuffleNoImmediateRepeat,
    )?;
    println!("Channel {id} on air");

    let mut listeners = Vec::new();
    for name in ["alice", "bob"] {
        let (sink, mut rx) = ChannelSink::new(32);
        registry.attach(id, Box::new(sink))?;
        listeners.push(tokio::spawn(async move {
            let mut received = 0usize;
            while let Some(chunk) = rx.recv().await {
                received += chunk.len();
                if received >= 64 * 1024 {
                    break;
                }
            }
            println!("{name} received {received} bytes");
        }));
    }

    for listener in listeners {
        listener.await?;
    }

    if let Ok(Some(track)) = registry.now_playing(id) {
        println!("Now playing: {}", track.title.as_deref().unwrap_or(&track.uri));
    }

    registry.stop(id)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
