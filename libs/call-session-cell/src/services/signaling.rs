// libs/call-session-cell/src/services/signaling.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use shared_models::Identity;

use crate::error::CallSessionError;
use crate::services::media::MediaStream;

/// Identifies one call negotiation on the signaling network.
///
/// The caller mints the handle before placing the call, so events that
/// race the placement are still attributable to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallHandle(Uuid);

impl CallHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for CallHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call_{}", self.0.simple())
    }
}

#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// The local address is registered and reachable.
    Ready { identity: Identity },
    IncomingCall { call: CallHandle, from: Identity },
    /// Far-end media arrived for an answered call.
    RemoteStream { call: CallHandle, stream: MediaStream },
    /// The far end hung up or rejected.
    CallClosed { call: CallHandle },
    CallFailed { call: CallHandle, error: CallSessionError },
    /// Lost the connection to the signaling network.
    Disconnected,
}

pub type SignalingEvents = mpsc::UnboundedReceiver<SignalingEvent>;

/// An open registration: the endpoint to act through and the events it produces.
pub struct SignalingLink {
    pub endpoint: Arc<dyn SignalingEndpoint>,
    pub events: SignalingEvents,
}

impl fmt::Debug for SignalingLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalingLink")
            .field("identity", self.endpoint.local_identity())
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait SignalingNetwork: Send + Sync {
    /// Registers `identity` on the network. Fails with an address conflict
    /// when it is already taken, or when the network cannot be reached.
    async fn open(&self, identity: &Identity) -> Result<SignalingLink, CallSessionError>;
}

#[async_trait]
pub trait SignalingEndpoint: Send + Sync {
    fn local_identity(&self) -> &Identity;

    /// Offers `local_stream` to `remote`. The answer arrives later as
    /// `SignalingEvent::RemoteStream` for the same handle.
    async fn place_call(
        &self,
        call: CallHandle,
        remote: &Identity,
        local_stream: &MediaStream,
    ) -> Result<(), CallSessionError>;

    async fn answer(&self, call: CallHandle, local_stream: &MediaStream) -> Result<(), CallSessionError>;

    /// Terminates the negotiation. Idempotent.
    fn close(&self, call: CallHandle);

    /// Releases the address registration.
    fn teardown(&self);
}
