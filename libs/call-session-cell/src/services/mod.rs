// libs/call-session-cell/src/services/mod.rs

pub mod loopback;
pub mod media;
pub mod session;
pub mod signaling;
pub mod state;

pub use loopback::{LoopbackMediaGateway, LoopbackNetwork};
pub use media::{MediaConstraints, MediaDeviceGateway, MediaStream, MediaTrack, TrackKind};
pub use session::CallSessionManager;
pub use signaling::{CallHandle, SignalingEndpoint, SignalingEvent, SignalingLink, SignalingNetwork};
pub use state::Trigger;
