//! Integration tests for channel lifecycle and fan-out behavior.
//!
//! A channel starts streaming the moment it is created, so a sink
//! attached afterwards joins mid-stream at a chunk boundary. The
//! assertions below therefore check content against the periodic byte
//! pattern a looping playlist produces, instead of assuming delivery
//! starts at stream byte zero.

use castchannel::{ChannelRegistry, Error, RelayConfig};
use castplaylist::{OrderingPolicy, TrackDescriptor};
use castrelay::{ChannelSink, CollectSink};
use castsource::MemoryTrackSource;
use std::sync::Arc;
use std::time::Duration;

fn tracks(uris: &[&str]) -> Vec<TrackDescriptor> {
    uris.iter().map(|u| TrackDescriptor::new(*u)).collect()
}

/// Polls `cond` until it holds or five seconds pass.
async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for: {what}"));
}

fn contains_seq(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Drops everything before the first occurrence of `marker`, giving a
/// cycle-aligned view of a mid-stream capture.
fn aligned_at<'a>(bytes: &'a [u8], marker: &[u8]) -> &'a [u8] {
    let start = bytes
        .windows(marker.len())
        .position(|w| w == marker)
        .expect("cycle marker not found in captured stream");
    &bytes[start..]
}

fn raw_config() -> RelayConfig {
    RelayConfig::default().without_metadata()
}

#[tokio::test]
async fn test_create_rejects_empty_playlist() {
    let registry = ChannelRegistry::new(Arc::new(MemoryTrackSource::new()));
    let err = registry
        .create(vec![], OrderingPolicy::Sequential)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Playlist(castplaylist::Error::EmptyPlaylist)
    ));
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn test_sequential_delivery_wraps_across_cycles() {
    let source = Arc::new(
        MemoryTrackSource::new()
            .with_chunk_size(3)
            .with_track("a", &b"HELLO-"[..])
            .with_track("b", &b"WORLD!"[..]),
    );
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(tracks(&["a", "b"]), OrderingPolicy::Sequential)
        .unwrap();

    let (sink, handle) = CollectSink::new();
    registry.attach(id, Box::new(sink)).unwrap();

    // Three cycles of capture are enough to contain the a→b→a wrap
    // regardless of where in the cycle the sink joined.
    wait_until("enough bytes delivered", || handle.len() >= 40).await;
    registry.stop(id).unwrap();

    assert!(contains_seq(&handle.bytes(), b"HELLO-WORLD!HELLO-"));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let source = Arc::new(MemoryTrackSource::new().with_track("a", &b"A"[..]));
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(tracks(&["a"]), OrderingPolicy::Sequential)
        .unwrap();

    assert_eq!(registry.list(), vec![id]);
    registry.stop(id).unwrap();
    assert!(registry.list().is_empty());

    assert!(matches!(registry.stop(id), Err(Error::ChannelNotFound(_))));
}

#[tokio::test]
async fn test_attach_after_stop_fails() {
    let source = Arc::new(MemoryTrackSource::new().with_track("a", &b"A"[..]));
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(tracks(&["a"]), OrderingPolicy::Sequential)
        .unwrap();

    let (first, _handle) = CollectSink::new();
    let sink_id = registry.attach(id, Box::new(first)).unwrap();
    registry.stop(id).unwrap();

    let (second, _handle) = CollectSink::new();
    assert!(matches!(
        registry.attach(id, Box::new(second)),
        Err(Error::ChannelNotFound(_))
    ));

    // Detach stays a silent no-op, even on a dead channel.
    registry.detach(id, sink_id);
}

#[tokio::test]
async fn test_broken_tracks_are_skipped_below_threshold() {
    let source = Arc::new(
        MemoryTrackSource::new()
            .with_failure("bad1")
            .with_track("good1", &b"GOOD"[..])
            .with_failure("bad2")
            .with_track("good2", &b"MORE"[..]),
    );
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(
            tracks(&["bad1", "good1", "bad2", "good2"]),
            OrderingPolicy::Sequential,
        )
        .unwrap();

    let (sink, handle) = CollectSink::new();
    registry.attach(id, Box::new(sink)).unwrap();

    // Broken tracks alternate with good ones, so the consecutive-failure
    // count never reaches the threshold and playable content keeps
    // looping as "GOODMORE".
    wait_until("good tracks delivered", || handle.len() >= 24).await;

    assert!(contains_seq(&handle.bytes(), b"GOODMOREGOOD"));
    assert_eq!(registry.list(), vec![id]);
    registry.stop(id).unwrap();
}

#[tokio::test]
async fn test_channel_terminates_when_every_track_fails() {
    let source = Arc::new(
        MemoryTrackSource::new()
            .with_failure("bad1")
            .with_failure("bad2")
            .with_failure("bad3"),
    );
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(tracks(&["bad1", "bad2", "bad3"]), OrderingPolicy::Sequential)
        .unwrap();

    let (sink, mut rx) = ChannelSink::new(8);
    registry.attach(id, Box::new(sink)).unwrap();

    // The sink observes stream end (not an error frame) once the
    // consecutive-failure threshold — one attempt per track — is spent.
    let observed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("channel did not terminate in time");
    assert!(observed.is_none());

    wait_until("channel removed from registry", || {
        registry.list().is_empty()
    })
    .await;
    assert!(matches!(registry.stop(id), Err(Error::ChannelNotFound(_))));
}

#[tokio::test]
async fn test_dead_sink_does_not_disturb_the_survivor() {
    let cycle = b"HELLO-WORLD!";
    let source = Arc::new(
        MemoryTrackSource::new()
            .with_chunk_size(4)
            .with_track("a", &b"HELLO-"[..])
            .with_track("b", &b"WORLD!"[..]),
    );
    let registry = ChannelRegistry::with_default_config(source.clone(), raw_config());
    let compare_len = 60;

    // Control run: one undisturbed sink on its own channel.
    let control_id = registry
        .create(tracks(&["a", "b"]), OrderingPolicy::Sequential)
        .unwrap();
    let (control_sink, control) = CollectSink::new();
    registry.attach(control_id, Box::new(control_sink)).unwrap();

    // Experiment run: two sinks, one killed mid-stream.
    let id = registry
        .create(tracks(&["a", "b"]), OrderingPolicy::Sequential)
        .unwrap();
    let (doomed_sink, doomed) = CollectSink::new();
    let (survivor_sink, survivor) = CollectSink::new();
    registry.attach(id, Box::new(doomed_sink)).unwrap();
    registry.attach(id, Box::new(survivor_sink)).unwrap();

    wait_until("both sinks received data", || {
        doomed.len() >= 12 && survivor.len() >= 12
    })
    .await;
    doomed.kill();

    wait_until("survivor and control caught up", || {
        survivor.len() >= compare_len + 24 && control.len() >= compare_len + 24
    })
    .await;
    registry.stop(id).unwrap();
    registry.stop(control_id).unwrap();

    // Both captures joined mid-stream; align each to a cycle boundary and
    // the survivor must match the undisturbed control byte for byte.
    let survivor_bytes = survivor.bytes();
    let control_bytes = control.bytes();
    assert_eq!(
        aligned_at(&survivor_bytes, cycle)[..compare_len],
        aligned_at(&control_bytes, cycle)[..compare_len]
    );
}

#[tokio::test]
async fn test_now_playing_and_info() {
    let source = Arc::new(MemoryTrackSource::new().with_track("a", vec![0u8; 64 * 1024]));
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(
            vec![TrackDescriptor::new("a").with_title("Only Track")],
            OrderingPolicy::Sequential,
        )
        .unwrap();

    wait_until("now playing published", || {
        matches!(registry.now_playing(id), Ok(Some(_)))
    })
    .await;

    let track = registry.now_playing(id).unwrap().unwrap();
    assert_eq!(track.uri, "a");

    let info = registry.info(id).unwrap();
    assert_eq!(info.id, id);
    assert_eq!(info.tracks, 1);
    assert_eq!(info.policy, OrderingPolicy::Sequential);
    assert_eq!(info.metaint, None);

    registry.stop(id).unwrap();
    assert!(matches!(
        registry.now_playing(id),
        Err(Error::ChannelNotFound(_))
    ));
}

#[tokio::test]
async fn test_icy_blocks_ride_in_band() {
    let metaint = 64;
    let source = Arc::new(
        MemoryTrackSource::new()
            .with_chunk_size(10)
            .with_track("a", vec![b'X'; 500]),
    );
    let registry = ChannelRegistry::new(source);
    let id = registry
        .create_with_config(
            vec![TrackDescriptor::new("a")
                .with_title("Song")
                .with_artist("Artist")],
            OrderingPolicy::Sequential,
            RelayConfig::default().with_metaint(metaint),
        )
        .unwrap();

    let (sink, handle) = CollectSink::new();
    registry.attach(id, Box::new(sink)).unwrap();
    assert_eq!(registry.info(id).unwrap().metaint, Some(metaint));

    wait_until("two metadata intervals captured", || {
        handle.len() >= 2 * metaint + 80
    })
    .await;
    registry.stop(id).unwrap();

    let bytes = handle.bytes();

    // Audio payload is all 'X'; the first other byte is the length
    // prefix of a metadata block, at most one interval into the capture.
    let first_block = bytes
        .iter()
        .position(|b| *b != b'X')
        .expect("no metadata block captured");
    assert!(first_block <= metaint);

    let length_byte = bytes[first_block] as usize;
    assert!(length_byte > 0);
    let block = &bytes[first_block + 1..first_block + 1 + length_byte * 16];
    let text = String::from_utf8_lossy(block);
    assert!(text.starts_with("StreamTitle='Song - Artist';"), "got: {text}");

    // The next block sits exactly one interval of audio further on.
    let second_block = first_block + 1 + length_byte * 16 + metaint;
    assert_eq!(bytes[second_block] as usize, length_byte);
}

#[tokio::test]
async fn test_dropping_the_registry_ends_its_channels() {
    let source = Arc::new(MemoryTrackSource::new().with_track("a", &b"AAAA"[..]));
    let registry = ChannelRegistry::with_default_config(source, raw_config());
    let id = registry
        .create(tracks(&["a"]), OrderingPolicy::Sequential)
        .unwrap();

    let (sink, mut rx) = ChannelSink::new(8);
    registry.attach(id, Box::new(sink)).unwrap();

    // Drain a little to prove the channel is live, then drop the registry.
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no data before drop");
    assert!(first.is_some());

    drop(registry);

    // The relay observes the cancellation and releases the sink.
    let end = tokio::time::timeout(Duration::from_secs(5), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(end.is_ok(), "sink never observed stream end");
}
