// libs/call-session-cell/src/lib.rs
//! # Call Session Cell
//!
//! Client-side lifecycle of a peer-to-peer video consultation between a
//! patient and a doctor: signaling, the call state machine, camera and
//! microphone ownership, mute / hide-video, and cleanup on hangup.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Call Session Cell                   |
//! +-----------------------------------------------------+
//! |  models.rs      |  Status, snapshots, events        |
//! |  error.rs       |  Device / signaling / state errors|
//! |  services/      |                                   |
//! |    media.rs     |  Media device gateway             |
//! |    signaling.rs |  Signaling network & endpoint     |
//! |    state.rs     |  Pure transition table            |
//! |    session.rs   |  Call session manager (driver)    |
//! |    loopback.rs  |  In-process adapters              |
//! +-----------------------------------------------------+
//! ```
//!
//! The manager runs as one task that consumes user intents, signaling
//! events and the results of its own device / network calls from a single
//! `select!` loop, so no two handlers ever run at the same time. Every
//! asynchronous result is tagged with the call attempt that started it and
//! is discarded (its media released) once that attempt is over.
//!
//! ## Call states
//!
//! ```text
//! Idle --start_outgoing--> Outgoing --remote stream--> Connected
//! Idle --incoming call---> Incoming --answer + stream--> Connected
//! Outgoing | Incoming | Connected --end / reject / hangup / failure--> Idle
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use call_session_cell::{CallSessionManager, LoopbackMediaGateway, LoopbackNetwork};
//! use shared_config::CallConfig;
//! use shared_models::Identity;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let network = LoopbackNetwork::new();
//! let config = CallConfig::default().for_identity("patient-7");
//! let media = Arc::new(LoopbackMediaGateway::new());
//!
//! let doctor_config = config.for_identity("doctor-42");
//! let _doctor = CallSessionManager::start(&doctor_config, media.clone(), &network).await?;
//!
//! let session = CallSessionManager::start(&config, media, &network).await?;
//! session.start_outgoing(Identity::new("doctor-42")?).await?;
//! session.toggle_mute().await?;
//! session.end_call().await?;
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See `shared_config::CallConfig::from_env`:
//! - `CALL_LOCAL_IDENTITY` - address registered on the signaling network
//! - `CALL_AUTO_DIAL` - remote identity dialled as soon as the address is ready
//! - `CALL_RING_TIMEOUT_SECS` - how long an outgoing call may ring
//! - `CALL_MEDIA_AUDIO` / `CALL_MEDIA_VIDEO` - devices to open

pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use error::{CallSessionError, DeviceErrorKind, SignalingErrorKind};

pub use models::{
    CallDirection, CallEvent, CallSnapshot, CallStatus, CallSummary, EndReason,
};

pub use services::{
    CallHandle, CallSessionManager, LoopbackMediaGateway, LoopbackNetwork, MediaConstraints,
    MediaDeviceGateway, MediaStream, MediaTrack, SignalingEndpoint, SignalingEvent,
    SignalingLink, SignalingNetwork, TrackKind, Trigger,
};
