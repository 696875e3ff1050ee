// libs/call-session-cell/src/services/media.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use shared_config::CallConfig;

use crate::error::CallSessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }

    pub fn from_config(config: &CallConfig) -> Self {
        Self {
            audio: config.media_audio,
            video: config.media_video,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.audio && !self.video
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::audio_video()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "video")]
    Video,
}

#[derive(Debug)]
struct TrackState {
    id: Uuid,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

/// One audio or video component of a stream. Clones share state.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    inner: Arc<TrackState>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            inner: Arc::new(TrackState {
                id: Uuid::new_v4(),
                kind,
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Returns `true` only for the call that actually stopped the track.
    pub fn stop(&self) -> bool {
        !self.inner.stopped.swap(true, Ordering::SeqCst)
    }
}

/// Handle to a set of media tracks.
///
/// Local streams are owned by the call session; remote streams belong to
/// the transport and are only referenced for rendering.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: Uuid,
    tracks: Arc<[MediaTrack]>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks: tracks.into(),
        }
    }

    pub fn from_constraints(constraints: MediaConstraints) -> Self {
        let mut tracks = Vec::with_capacity(2);
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio));
        }
        if constraints.video {
            tracks.push(MediaTrack::new(TrackKind::Video));
        }
        Self::new(tracks)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn track(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks.iter().find(|track| track.kind() == kind)
    }

    /// Stops every track; safe to repeat. Returns how many tracks this call stopped.
    pub fn stop_all(&self) -> usize {
        self.tracks.iter().filter(|track| track.stop()).count()
    }

    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|track| !track.is_stopped())
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaStream {}

/// Host camera/microphone access.
#[async_trait]
pub trait MediaDeviceGateway: Send + Sync {
    /// Opens the requested devices. Fails with `CallSessionError::Device`.
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream, CallSessionError>;

    /// Stops every track in the stream. Idempotent.
    fn release(&self, stream: &MediaStream) {
        stream.stop_all();
    }

    /// No-op when the stream has no track of that kind.
    fn set_track_enabled(&self, stream: &MediaStream, kind: TrackKind, enabled: bool) {
        if let Some(track) = stream.track(kind) {
            track.set_enabled(enabled);
        }
    }
}
