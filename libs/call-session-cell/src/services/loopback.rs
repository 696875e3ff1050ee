// libs/call-session-cell/src/services/loopback.rs
//! In-process signaling network and media gateway.
//!
//! Lets several call session managers in one process reach each other by
//! identity, with synthetic media. Used by the consultation console and by
//! the integration tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::Identity;

use crate::error::{CallSessionError, DeviceErrorKind, SignalingErrorKind};
use crate::services::media::{MediaConstraints, MediaDeviceGateway, MediaStream};
use crate::services::signaling::{
    CallHandle, SignalingEndpoint, SignalingEvent, SignalingLink, SignalingNetwork,
};

// ==============================================================================
// SIGNALING
// ==============================================================================

struct PeerEntry {
    registration: Uuid,
    events: mpsc::UnboundedSender<SignalingEvent>,
}

struct LoopbackCall {
    caller: Identity,
    callee: Identity,
    caller_stream: MediaStream,
    callee_stream: Option<MediaStream>,
}

impl LoopbackCall {
    fn counterpart(&self, identity: &Identity) -> Option<&Identity> {
        if &self.caller == identity {
            Some(&self.callee)
        } else if &self.callee == identity {
            Some(&self.caller)
        } else {
            None
        }
    }
}

struct NetworkState {
    online: bool,
    peers: HashMap<Identity, PeerEntry>,
    calls: HashMap<CallHandle, LoopbackCall>,
}

impl NetworkState {
    fn notify(&self, identity: &Identity, event: SignalingEvent) -> bool {
        match self.peers.get(identity) {
            Some(peer) => peer.events.send(event).is_ok(),
            None => false,
        }
    }

    fn close_call(&mut self, call: CallHandle, closed_by: &Identity) {
        let Some(entry) = self.calls.remove(&call) else {
            return;
        };
        if let Some(other) = entry.counterpart(closed_by) {
            let other = other.clone();
            self.notify(&other, SignalingEvent::CallClosed { call });
        }
    }
}

/// Shared registry of identities; clones refer to the same network.
#[derive(Clone)]
pub struct LoopbackNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                online: true,
                peers: HashMap::new(),
                calls: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Taking the network offline disconnects every peer and drops all calls.
    pub fn set_online(&self, online: bool) {
        let mut state = self.lock();
        if state.online == online {
            return;
        }
        state.online = online;
        if !online {
            warn!("Loopback network going offline");
            state.calls.clear();
            for peer in state.peers.values() {
                let _ = peer.events.send(SignalingEvent::Disconnected);
            }
        } else {
            info!("Loopback network back online");
        }
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.lock().peers.contains_key(identity)
    }

    pub fn active_calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// Delivers a failure for `call` to both parties, as a dropped transport would.
    pub fn fail_call(&self, call: CallHandle, error: CallSessionError) {
        let mut state = self.lock();
        if let Some(entry) = state.calls.remove(&call) {
            for party in [&entry.caller, &entry.callee] {
                state.notify(
                    party,
                    SignalingEvent::CallFailed {
                        call,
                        error: error.clone(),
                    },
                );
            }
        }
    }

    /// Forgets `call` without notifying either party, as a lost offer would.
    /// Later answers on it fail with `Closed`.
    pub fn drop_call(&self, call: CallHandle) -> bool {
        let dropped = self.lock().calls.remove(&call).is_some();
        if dropped {
            debug!("Dropped {} silently", call);
        }
        dropped
    }
}

#[async_trait]
impl SignalingNetwork for LoopbackNetwork {
    async fn open(&self, identity: &Identity) -> Result<SignalingLink, CallSessionError> {
        let mut state = self.lock();
        if !state.online {
            return Err(CallSessionError::signaling(
                SignalingErrorKind::NetworkUnreachable,
                "loopback network is offline",
            ));
        }
        if state.peers.contains_key(identity) {
            return Err(CallSessionError::signaling(
                SignalingErrorKind::AddressConflict,
                format!("{} is already registered", identity),
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registration = Uuid::new_v4();
        let _ = events_tx.send(SignalingEvent::Ready {
            identity: identity.clone(),
        });
        state.peers.insert(
            identity.clone(),
            PeerEntry {
                registration,
                events: events_tx,
            },
        );
        debug!("Registered {} on loopback network", identity);

        let endpoint = LoopbackEndpoint {
            network: self.clone(),
            identity: identity.clone(),
            registration,
            torn_down: AtomicBool::new(false),
        };

        Ok(SignalingLink {
            endpoint: Arc::new(endpoint),
            events: events_rx,
        })
    }
}

pub struct LoopbackEndpoint {
    network: LoopbackNetwork,
    identity: Identity,
    registration: Uuid,
    torn_down: AtomicBool,
}

impl LoopbackEndpoint {
    fn ensure_online(&self, state: &NetworkState) -> Result<(), CallSessionError> {
        if !state.online {
            return Err(CallSessionError::signaling(
                SignalingErrorKind::NetworkUnreachable,
                "loopback network is offline",
            ));
        }
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(CallSessionError::signaling(
                SignalingErrorKind::Closed,
                "signaling address was torn down",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SignalingEndpoint for LoopbackEndpoint {
    fn local_identity(&self) -> &Identity {
        &self.identity
    }

    async fn place_call(
        &self,
        call: CallHandle,
        remote: &Identity,
        local_stream: &MediaStream,
    ) -> Result<(), CallSessionError> {
        let mut state = self.network.lock();
        self.ensure_online(&state)?;

        if remote == &self.identity || !state.peers.contains_key(remote) {
            return Err(CallSessionError::signaling(
                SignalingErrorKind::RemoteUnreachable,
                format!("{} is not reachable", remote),
            ));
        }

        state.calls.insert(
            call,
            LoopbackCall {
                caller: self.identity.clone(),
                callee: remote.clone(),
                caller_stream: local_stream.clone(),
                callee_stream: None,
            },
        );

        let delivered = state.notify(
            remote,
            SignalingEvent::IncomingCall {
                call,
                from: self.identity.clone(),
            },
        );
        if !delivered {
            state.calls.remove(&call);
            return Err(CallSessionError::signaling(
                SignalingErrorKind::RemoteUnreachable,
                format!("{} stopped listening", remote),
            ));
        }

        debug!("{} offered {} to {}", self.identity, call, remote);
        Ok(())
    }

    async fn answer(&self, call: CallHandle, local_stream: &MediaStream) -> Result<(), CallSessionError> {
        let mut state = self.network.lock();
        self.ensure_online(&state)?;

        let (caller, caller_stream) = match state.calls.get_mut(&call) {
            Some(entry) if entry.callee == self.identity => {
                entry.callee_stream = Some(local_stream.clone());
                (entry.caller.clone(), entry.caller_stream.clone())
            }
            _ => {
                return Err(CallSessionError::signaling(
                    SignalingErrorKind::Closed,
                    format!("{} is no longer ringing", call),
                ))
            }
        };

        state.notify(
            &self.identity,
            SignalingEvent::RemoteStream {
                call,
                stream: caller_stream,
            },
        );
        state.notify(
            &caller,
            SignalingEvent::RemoteStream {
                call,
                stream: local_stream.clone(),
            },
        );

        debug!("{} answered {} from {}", self.identity, call, caller);
        Ok(())
    }

    fn close(&self, call: CallHandle) {
        let mut state = self.network.lock();
        state.close_call(call, &self.identity);
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut state = self.network.lock();
        let owns_registration = state
            .peers
            .get(&self.identity)
            .is_some_and(|peer| peer.registration == self.registration);
        if !owns_registration {
            return;
        }

        let calls: Vec<CallHandle> = state
            .calls
            .iter()
            .filter(|(_, entry)| entry.counterpart(&self.identity).is_some())
            .map(|(call, _)| *call)
            .collect();
        for call in calls {
            state.close_call(call, &self.identity);
        }

        state.peers.remove(&self.identity);
        info!("Released loopback address {}", self.identity);
    }
}

// ==============================================================================
// MEDIA
// ==============================================================================

struct GatewayState {
    acquired: AtomicUsize,
    released: AtomicUsize,
    failures: Mutex<VecDeque<CallSessionError>>,
    delay: Mutex<Duration>,
}

/// Synthetic camera and microphone that keeps count of what it hands out.
#[derive(Clone)]
pub struct LoopbackMediaGateway {
    state: Arc<GatewayState>,
}

impl Default for LoopbackMediaGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackMediaGateway {
    pub fn new() -> Self {
        Self {
            state: Arc::new(GatewayState {
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
                failures: Mutex::new(VecDeque::new()),
                delay: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// The next `acquire` fails with `error`. Calls queue up.
    pub fn fail_next(&self, error: CallSessionError) {
        self.state
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(error);
    }

    /// Simulated time the device takes to open.
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = delay;
    }

    pub fn acquired_count(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    /// Number of `release` calls, including repeats.
    pub fn released_count(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.acquired_count().saturating_sub(self.released_count())
    }

    fn delay(&self) -> Duration {
        *self.state.delay.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_failure(&self) -> Option<CallSessionError> {
        self.state
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

#[async_trait]
impl MediaDeviceGateway for LoopbackMediaGateway {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream, CallSessionError> {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_failure() {
            debug!("Simulated device failure: {}", error);
            return Err(error);
        }
        if constraints.is_empty() {
            return Err(CallSessionError::device(
                DeviceErrorKind::NotFound,
                "no audio or video requested",
            ));
        }

        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MediaStream::from_constraints(constraints))
    }

    fn release(&self, stream: &MediaStream) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
        stream.stop_all();
    }
}
