//! Track ordering policies and the playback scheduler.
//!
//! The scheduler decides which track a channel plays next. It owns the
//! play history for the current cycle; a cycle is one full pass through
//! the playlist, after which the history resets. The random source is
//! injectable so shuffle sequences are reproducible in tests.

use crate::playlist::Playlist;
use crate::track::TrackDescriptor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// How a channel walks its playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Playlist order, wrapping to the first track after the last.
    #[default]
    Sequential,
    /// A fresh uniform permutation per cycle, guaranteed never to open a
    /// cycle with the track that closed the previous one (when the
    /// playlist has more than one track).
    ShuffleNoImmediateRepeat,
}

/// Picks the next track under an [`OrderingPolicy`].
///
/// Playback is serialized per channel, so the scheduler is single-owner
/// mutable state inside the relay task.
#[derive(Debug)]
pub struct PlaybackScheduler<R: Rng = StdRng> {
    playlist: Arc<Playlist>,
    policy: OrderingPolicy,
    rng: R,
    /// URIs already played in the current cycle.
    history: HashSet<String>,
    /// Index of the last track handed out (sequential walk position).
    cursor: Option<usize>,
    /// Remainder of the current shuffle permutation, consumed front to back.
    queue: VecDeque<usize>,
    last_uri: Option<String>,
}

impl PlaybackScheduler<StdRng> {
    pub fn new(playlist: Arc<Playlist>, policy: OrderingPolicy) -> Self {
        Self::with_rng(playlist, policy, StdRng::from_os_rng())
    }

    /// Seeded constructor for reproducible shuffle sequences.
    pub fn seeded(playlist: Arc<Playlist>, policy: OrderingPolicy, seed: u64) -> Self {
        Self::with_rng(playlist, policy, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> PlaybackScheduler<R> {
    pub fn with_rng(playlist: Arc<Playlist>, policy: OrderingPolicy, rng: R) -> Self {
        Self {
            playlist,
            policy,
            rng,
            history: HashSet::new(),
            cursor: None,
            queue: VecDeque::new(),
            last_uri: None,
        }
    }

    pub fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.playlist
    }

    /// Number of tracks already played in the current cycle.
    pub fn played_this_cycle(&self) -> usize {
        self.history.len()
    }

    /// Returns the next track to play and records it in the history.
    pub fn next(&mut self) -> TrackDescriptor {
        let index = match self.policy {
            OrderingPolicy::Sequential => self.next_sequential(),
            OrderingPolicy::ShuffleNoImmediateRepeat => self.next_shuffled(),
        };

        let track = self.playlist.tracks()[index].clone();
        self.cursor = Some(index);
        self.history.insert(track.uri.clone());
        self.last_uri = Some(track.uri.clone());
        track
    }

    fn next_sequential(&mut self) -> usize {
        match self.cursor {
            None => 0,
            Some(last) => {
                let next = last + 1;
                if next >= self.playlist.len() {
                    // End of cycle: wrap and start a fresh history.
                    self.history.clear();
                    0
                } else {
                    next
                }
            }
        }
    }

    fn next_shuffled(&mut self) -> usize {
        if self.queue.is_empty() {
            self.refill_cycle();
        }
        self.queue.pop_front().unwrap_or(0)
    }

    /// Draws a fresh Fisher–Yates permutation for the next cycle.
    ///
    /// If its first pick would immediately repeat the track that closed the
    /// previous cycle, it is swapped with the second; within a cycle no
    /// repeats are possible anyway.
    fn refill_cycle(&mut self) {
        self.history.clear();

        let mut order: Vec<usize> = (0..self.playlist.len()).collect();
        order.shuffle(&mut self.rng);

        if order.len() > 1 {
            if let Some(last) = &self.last_uri {
                if self.playlist.tracks()[order[0]].uri == *last {
                    order.swap(0, 1);
                }
            }
        }

        tracing::trace!(tracks = order.len(), "Shuffle cycle refilled");
        self.queue.extend(order);
    }
}
