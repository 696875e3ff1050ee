// libs/call-session-cell/src/services/session.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use shared_config::CallConfig;
use shared_models::Identity;

use crate::error::CallSessionError;
use crate::models::{CallDirection, CallEvent, CallSnapshot, CallStatus, CallSummary, EndReason};
use crate::services::media::{MediaConstraints, MediaDeviceGateway, MediaStream, TrackKind};
use crate::services::signaling::{
    CallHandle, SignalingEndpoint, SignalingEvent, SignalingEvents, SignalingNetwork,
};
use crate::services::state::Trigger;

type Reply<T> = oneshot::Sender<Result<T, CallSessionError>>;

enum Command {
    StartOutgoing { remote: Identity, reply: Reply<()> },
    Answer { reply: Reply<()> },
    Reject { reply: Reply<()> },
    EndCall { reply: oneshot::Sender<()> },
    ToggleMute { reply: oneshot::Sender<Option<bool>> },
    ToggleVideo { reply: oneshot::Sender<Option<bool>> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Results of boundary calls running outside the driver, tagged with the
/// attempt that started them.
enum Completion {
    MediaAcquired { attempt: u64, result: Result<MediaStream, CallSessionError> },
    CallPlaced { attempt: u64, call: CallHandle, result: Result<(), CallSessionError> },
    CallAnswered { attempt: u64, call: CallHandle, result: Result<(), CallSessionError> },
}

/// The single asynchronous step the current attempt is waiting on.
enum Pending {
    OutgoingMedia { remote: Identity, reply: Option<Reply<()>> },
    PlacingCall { reply: Option<Reply<()>> },
    AnswerMedia { reply: Reply<()> },
    Answering { reply: Reply<()> },
}

impl Pending {
    fn into_reply(self) -> Option<Reply<()>> {
        match self {
            Pending::OutgoingMedia { reply, .. } | Pending::PlacingCall { reply } => reply,
            Pending::AnswerMedia { reply } | Pending::Answering { reply } => Some(reply),
        }
    }
}

/// Call session manager: owns one peer-to-peer call at a time.
///
/// Cheap to clone; every clone talks to the same driver task. The driver
/// exits (and releases the signaling address) on `shutdown` or once the
/// last clone is dropped.
#[derive(Debug, Clone)]
pub struct CallSessionManager {
    local_identity: Identity,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<CallSnapshot>,
    events: broadcast::Sender<CallEvent>,
}

impl CallSessionManager {
    /// Registers the configured identity on `network` and starts the driver.
    pub async fn start(
        config: &CallConfig,
        media: Arc<dyn MediaDeviceGateway>,
        network: &dyn SignalingNetwork,
    ) -> Result<Self, CallSessionError> {
        if !config.is_configured() {
            return Err(CallSessionError::Configuration {
                message: "local identity is required".to_string(),
            });
        }

        let local_identity = Identity::new(config.local_identity.trim())?;
        let auto_dial = config
            .auto_dial
            .as_deref()
            .map(|remote| Identity::new(remote.trim()))
            .transpose()?;

        info!("Opening signaling address for {}", local_identity);
        let link = network.open(&local_identity).await?;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(CallSnapshot::idle(local_identity.clone()));
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));

        let driver = SessionDriver {
            local_identity: local_identity.clone(),
            media,
            endpoint: link.endpoint,
            constraints: MediaConstraints::from_config(config),
            ring_timeout: config.ring_timeout(),
            auto_dial,
            state_tx,
            event_tx: event_tx.clone(),
            completion_tx,
            signaling_ready: false,
            status: CallStatus::Idle,
            attempt: 0,
            pending: None,
            remote_identity: None,
            direction: None,
            call: None,
            local_stream: None,
            remote_stream: None,
            muted: false,
            video_hidden: false,
            started_at: None,
            connected_at: None,
            ring_deadline: None,
        };

        tokio::spawn(driver.run(command_rx, link.events, completion_rx));

        Ok(Self {
            local_identity,
            commands: command_tx,
            state: state_rx,
            events: event_tx,
        })
    }

    pub fn local_identity(&self) -> &Identity {
        &self.local_identity
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> CallStatus {
        self.state.borrow().status
    }

    /// Change notifications for the full snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.state.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    /// Acquires local media and calls `remote`. Resolves once the offer is
    /// out and the status is `Outgoing`.
    pub async fn start_outgoing(&self, remote: Identity) -> Result<(), CallSessionError> {
        self.request(|reply| Command::StartOutgoing { remote, reply }).await?
    }

    /// Acquires local media and answers the ringing call. On a device
    /// failure the call keeps ringing until `reject` or `end_call`.
    pub async fn answer(&self) -> Result<(), CallSessionError> {
        self.request(|reply| Command::Answer { reply }).await?
    }

    pub async fn reject(&self) -> Result<(), CallSessionError> {
        self.request(|reply| Command::Reject { reply }).await?
    }

    /// Hangs up whatever is in progress. A no-op when idle.
    pub async fn end_call(&self) -> Result<(), CallSessionError> {
        self.request(|reply| Command::EndCall { reply }).await
    }

    /// Returns the new `muted` flag, or `None` when there is no local audio.
    pub async fn toggle_mute(&self) -> Result<Option<bool>, CallSessionError> {
        self.request(|reply| Command::ToggleMute { reply }).await
    }

    /// Returns the new `video_hidden` flag, or `None` when there is no local video.
    pub async fn toggle_video(&self) -> Result<Option<bool>, CallSessionError> {
        self.request(|reply| Command::ToggleVideo { reply }).await
    }

    /// Ends any call and releases the signaling address.
    pub async fn shutdown(&self) -> Result<(), CallSessionError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CallSessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| CallSessionError::SessionClosed)?;
        reply_rx.await.map_err(|_| CallSessionError::SessionClosed)
    }
}

struct SessionDriver {
    local_identity: Identity,
    media: Arc<dyn MediaDeviceGateway>,
    endpoint: Arc<dyn SignalingEndpoint>,
    constraints: MediaConstraints,
    ring_timeout: Duration,
    auto_dial: Option<Identity>,
    state_tx: watch::Sender<CallSnapshot>,
    event_tx: broadcast::Sender<CallEvent>,
    completion_tx: mpsc::UnboundedSender<Completion>,

    signaling_ready: bool,
    status: CallStatus,
    attempt: u64,
    pending: Option<Pending>,
    remote_identity: Option<Identity>,
    direction: Option<CallDirection>,
    call: Option<CallHandle>,
    local_stream: Option<MediaStream>,
    remote_stream: Option<MediaStream>,
    muted: bool,
    video_hidden: bool,
    started_at: Option<DateTime<Utc>>,
    connected_at: Option<DateTime<Utc>>,
    ring_deadline: Option<Instant>,
}

impl SessionDriver {
    #[instrument(skip_all, fields(identity = %self.local_identity))]
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut signaling: SignalingEvents,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        debug!("Call session driver started");
        let mut signaling_open = true;
        let mut shutdown_reply = None;

        loop {
            let ring_deadline = self.ring_deadline;
            let ring = async move {
                match ring_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;

                Some(completion) = completions.recv() => self.handle_completion(completion),

                event = signaling.recv(), if signaling_open => match event {
                    Some(event) => self.handle_signaling(event),
                    None => {
                        warn!("Signaling event stream closed");
                        signaling_open = false;
                        self.handle_signaling(SignalingEvent::Disconnected);
                    }
                },

                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All session handles dropped");
                        break;
                    }
                },

                _ = ring => self.handle_ring_timeout(),
            }

            self.publish();
        }

        self.close_down();

        // Late completions now fail to send and clean up after themselves;
        // whatever is already buffered is stale by now.
        completions.close();
        while let Ok(completion) = completions.try_recv() {
            self.handle_completion(completion);
        }

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
        debug!("Call session driver stopped");
    }

    // ==============================================================================
    // USER INTENTS
    // ==============================================================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartOutgoing { remote, reply } => self.start_outgoing(remote, Some(reply)),
            Command::Answer { reply } => self.answer(reply),
            Command::Reject { reply } => {
                let result = self.reject();
                self.reply(reply, result);
            }
            Command::EndCall { reply } => {
                self.end_call();
                self.reply(reply, ());
            }
            Command::ToggleMute { reply } => {
                let muted = self.toggle_track(TrackKind::Audio);
                self.reply(reply, muted);
            }
            Command::ToggleVideo { reply } => {
                let hidden = self.toggle_track(TrackKind::Video);
                self.reply(reply, hidden);
            }
            // Handled by the run loop
            Command::Shutdown { reply } => self.reply(reply, ()),
        }
    }

    fn start_outgoing(&mut self, remote: Identity, reply: Option<Reply<()>>) {
        if self.pending.is_some() || !self.status.permits(Trigger::PlaceCall) {
            self.respond(reply, Err(CallSessionError::invalid_state("start_outgoing", self.status)));
            return;
        }

        info!("Starting outgoing call to {}", remote);
        self.attempt += 1;
        self.pending = Some(Pending::OutgoingMedia { remote, reply });
        self.spawn_acquire();
    }

    fn answer(&mut self, reply: Reply<()>) {
        if let Err(err) = self.status.apply(Trigger::Answer) {
            self.reply(reply, Err(err));
            return;
        }
        if self.pending.is_some() || self.local_stream.is_some() {
            self.reply(reply, Err(CallSessionError::invalid_state("answer", self.status)));
            return;
        }

        info!("Answering call from {:?}", self.remote_identity);
        self.pending = Some(Pending::AnswerMedia { reply });
        self.spawn_acquire();
    }

    fn reject(&mut self) -> Result<(), CallSessionError> {
        self.status.apply(Trigger::Reject)?;
        info!("Rejecting call from {:?}", self.remote_identity);
        self.finish_call(Trigger::Reject, EndReason::Rejected);
        Ok(())
    }

    fn end_call(&mut self) {
        if self.status.is_active() {
            self.finish_call(Trigger::Hangup, EndReason::LocalHangup);
            return;
        }

        match self.pending.take() {
            Some(pending) => {
                info!("Cancelling outgoing call before media was ready");
                // Bump the attempt so the in-flight acquisition is discarded
                self.attempt += 1;
                self.cancel(pending);
            }
            None => debug!("end_call while idle, nothing to do"),
        }
    }

    fn toggle_track(&mut self, kind: TrackKind) -> Option<bool> {
        let Some(stream) = &self.local_stream else {
            debug!("Toggle {:?} ignored: no local stream", kind);
            return None;
        };
        if stream.track(kind).is_none() {
            debug!("Toggle {:?} ignored: stream has no such track", kind);
            return None;
        }

        let flag = match kind {
            TrackKind::Audio => &mut self.muted,
            TrackKind::Video => &mut self.video_hidden,
        };
        *flag = !*flag;
        let disabled = *flag;
        self.media.set_track_enabled(stream, kind, !disabled);

        debug!("{:?} track {}", kind, if disabled { "disabled" } else { "enabled" });
        Some(disabled)
    }

    // ==============================================================================
    // SIGNALING EVENTS
    // ==============================================================================

    fn handle_signaling(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Ready { identity } => {
                info!("Signaling address ready: {}", identity);
                self.signaling_ready = true;
                self.emit(CallEvent::Ready { identity });

                if let Some(remote) = self.auto_dial.take() {
                    info!("Auto-dialing {}", remote);
                    self.start_outgoing(remote, None);
                }
            }
            SignalingEvent::IncomingCall { call, from } => self.on_incoming_call(call, from),
            SignalingEvent::RemoteStream { call, stream } => self.on_remote_stream(call, stream),
            SignalingEvent::CallClosed { call } => {
                if self.call == Some(call) {
                    info!("Remote party closed {}", call);
                    self.finish_call(Trigger::RemoteHangup, EndReason::RemoteHangup);
                } else {
                    debug!("Ignoring close for unrelated {}", call);
                }
            }
            SignalingEvent::CallFailed { call, error } => {
                if self.call == Some(call) {
                    error!("Call {} failed: {}", call, error);
                    self.emit(CallEvent::Error {
                        message: error.to_string(),
                    });
                    self.finish_call(Trigger::Failure, EndReason::SignalingFailure);
                } else {
                    debug!("Ignoring failure for unrelated {}: {}", call, error);
                }
            }
            SignalingEvent::Disconnected => {
                warn!("Signaling network disconnected");
                self.signaling_ready = false;
                if self.status.is_active() {
                    self.emit(CallEvent::Error {
                        message: "signaling network disconnected".to_string(),
                    });
                    self.finish_call(Trigger::Failure, EndReason::SignalingFailure);
                } else if let Some(pending) = self.pending.take() {
                    self.attempt += 1;
                    self.cancel(pending);
                }
            }
        }
    }

    fn on_incoming_call(&mut self, call: CallHandle, from: Identity) {
        if self.pending.is_some() || !self.status.permits(Trigger::IncomingCall) {
            warn!("Busy ({}), rejecting incoming {} from {}", self.status, call, from);
            self.endpoint.close(call);
            self.emit(CallEvent::BusyRejected { from });
            return;
        }

        info!("Incoming {} from {}", call, from);
        self.attempt += 1;
        self.call = Some(call);
        self.remote_identity = Some(from.clone());
        self.direction = Some(CallDirection::Incoming);
        self.started_at = Some(Utc::now());
        self.transition(Trigger::IncomingCall);
        self.emit(CallEvent::IncomingCall { from });
    }

    fn on_remote_stream(&mut self, call: CallHandle, stream: MediaStream) {
        if self.call != Some(call) {
            debug!("Ignoring stream for unrelated {}", call);
            return;
        }

        match self.status {
            CallStatus::Connected => {
                debug!("Remote stream replaced on {}", call);
                self.remote_stream = Some(stream);
            }
            CallStatus::Incoming if self.local_stream.is_none() => {
                warn!("Remote stream on {} before answering, ignoring", call);
            }
            _ => {
                info!("Remote media received on {}", call);
                self.remote_stream = Some(stream);
                self.connected_at = Some(Utc::now());
                self.ring_deadline = None;
                self.transition(Trigger::RemoteStream);
            }
        }
    }

    fn handle_ring_timeout(&mut self) {
        self.ring_deadline = None;
        if self.status == CallStatus::Outgoing {
            warn!("No answer from {:?} within {:?}", self.remote_identity, self.ring_timeout);
            self.finish_call(Trigger::RingTimeout, EndReason::RingTimeout);
        }
    }

    // ==============================================================================
    // BOUNDARY COMPLETIONS
    // ==============================================================================

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::MediaAcquired { attempt, result } => self.on_media_acquired(attempt, result),
            Completion::CallPlaced { attempt, call, result } => self.on_call_placed(attempt, call, result),
            Completion::CallAnswered { attempt, call, result } => {
                self.on_call_answered(attempt, call, result)
            }
        }
    }

    fn on_media_acquired(&mut self, attempt: u64, result: Result<MediaStream, CallSessionError>) {
        let expecting = attempt == self.attempt
            && matches!(
                self.pending,
                Some(Pending::OutgoingMedia { .. } | Pending::AnswerMedia { .. })
            );

        if !expecting {
            match result {
                Ok(stream) => {
                    debug!("Releasing media from stale attempt {}", attempt);
                    self.media.release(&stream);
                }
                Err(err) => debug!("Stale media failure for attempt {}: {}", attempt, err),
            }
            return;
        }

        match (self.pending.take(), result) {
            (Some(Pending::OutgoingMedia { reply, .. }), Err(err)) => {
                warn!("Outgoing call aborted, media unavailable: {}", err);
                self.emit(CallEvent::Error {
                    message: err.to_string(),
                });
                self.respond(reply, Err(err));
            }
            (Some(Pending::OutgoingMedia { remote, reply }), Ok(stream)) => {
                let call = CallHandle::new();
                self.local_stream = Some(stream.clone());
                self.call = Some(call);
                self.remote_identity = Some(remote.clone());
                self.direction = Some(CallDirection::Outgoing);
                self.started_at = Some(Utc::now());
                self.ring_deadline = Some(Instant::now() + self.ring_timeout);
                self.pending = Some(Pending::PlacingCall { reply });
                self.transition(Trigger::PlaceCall);

                let endpoint = Arc::clone(&self.endpoint);
                let completions = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = endpoint.place_call(call, &remote, &stream).await;
                    let placed = result.is_ok();
                    if completions.send(Completion::CallPlaced { attempt, call, result }).is_err() && placed {
                        // Driver is gone; do not leave the callee ringing
                        endpoint.close(call);
                    }
                });
            }
            (Some(Pending::AnswerMedia { reply }), Err(err)) => {
                warn!("Cannot answer, media unavailable: {}", err);
                self.emit(CallEvent::Error {
                    message: err.to_string(),
                });
                self.reply(reply, Err(err));
            }
            (Some(Pending::AnswerMedia { reply }), Ok(stream)) => {
                let Some(call) = self.call else {
                    self.media.release(&stream);
                    self.reply(reply, Err(CallSessionError::invalid_state("answer", self.status)));
                    return;
                };
                self.local_stream = Some(stream.clone());
                self.pending = Some(Pending::Answering { reply });

                let endpoint = Arc::clone(&self.endpoint);
                let completions = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = endpoint.answer(call, &stream).await;
                    let answered = result.is_ok();
                    if completions.send(Completion::CallAnswered { attempt, call, result }).is_err() && answered {
                        endpoint.close(call);
                    }
                });
            }
            (other, result) => {
                // Unreachable given `expecting`; restore and drop the stream
                self.pending = other;
                if let Ok(stream) = result {
                    self.media.release(&stream);
                }
            }
        }
    }

    fn on_call_placed(&mut self, attempt: u64, call: CallHandle, result: Result<(), CallSessionError>) {
        if attempt != self.attempt || !matches!(self.pending, Some(Pending::PlacingCall { .. })) {
            if result.is_ok() {
                // The call may have been registered after we closed it
                debug!("Closing {} placed by stale attempt {}", call, attempt);
                self.endpoint.close(call);
            }
            return;
        }
        let Some(Pending::PlacingCall { reply }) = self.pending.take() else {
            return;
        };

        match result {
            Ok(()) => {
                debug!("Offer for {} delivered", call);
                self.respond(reply, Ok(()));
            }
            Err(err) => {
                warn!("Placing {} failed: {}", call, err);
                self.emit(CallEvent::Error {
                    message: err.to_string(),
                });
                self.finish_call(Trigger::Failure, EndReason::SignalingFailure);
                self.respond(reply, Err(err));
            }
        }
    }

    fn on_call_answered(&mut self, attempt: u64, call: CallHandle, result: Result<(), CallSessionError>) {
        if attempt != self.attempt || !matches!(self.pending, Some(Pending::Answering { .. })) {
            if result.is_ok() {
                debug!("Closing {} answered by stale attempt {}", call, attempt);
                self.endpoint.close(call);
            }
            return;
        }
        let Some(Pending::Answering { reply }) = self.pending.take() else {
            return;
        };

        match result {
            Ok(()) => self.reply(reply, Ok(())),
            Err(err) => {
                warn!("Answering {} failed: {}", call, err);
                self.emit(CallEvent::Error {
                    message: err.to_string(),
                });
                self.finish_call(Trigger::Failure, EndReason::SignalingFailure);
                self.reply(reply, Err(err));
            }
        }
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    fn spawn_acquire(&self) {
        let media = Arc::clone(&self.media);
        let completions = self.completion_tx.clone();
        let constraints = self.constraints;
        let attempt = self.attempt;
        tokio::spawn(async move {
            let result = media.acquire(constraints).await;
            if let Err(mpsc::error::SendError(Completion::MediaAcquired { result: Ok(stream), .. })) =
                completions.send(Completion::MediaAcquired { attempt, result })
            {
                // Driver is gone, nobody else will release this
                media.release(&stream);
            }
        });
    }

    /// Single exit path back to `Idle`; releases every resource of the attempt.
    fn finish_call(&mut self, trigger: Trigger, reason: EndReason) {
        let pending = self.pending.take();
        if let Some(call) = self.call.take() {
            self.endpoint.close(call);
        }
        if let Some(stream) = self.local_stream.take() {
            self.media.release(&stream);
        }
        self.remote_stream = None;
        self.muted = false;
        self.video_hidden = false;
        self.ring_deadline = None;
        self.attempt += 1;

        let ended_at = Utc::now();
        let connected_at = self.connected_at.take();
        let summary = match (self.remote_identity.take(), self.direction.take(), self.started_at.take()) {
            (Some(remote), Some(direction), Some(started_at)) => Some(CallSummary {
                remote,
                direction,
                started_at,
                connected_at,
                ended_at,
                duration_seconds: connected_at.map(|at| (ended_at - at).num_seconds()),
                reason,
            }),
            _ => None,
        };

        self.transition(trigger);
        info!("Call ended: {:?}", reason);
        if let Some(summary) = summary {
            self.emit(CallEvent::Ended(summary));
        }
        if let Some(pending) = pending {
            self.cancel(pending);
        }
    }

    fn transition(&mut self, trigger: Trigger) {
        match self.status.apply(trigger) {
            Ok(next) if next != self.status => {
                info!(from = %self.status, to = %next, "Call status changed");
                let from = std::mem::replace(&mut self.status, next);
                self.emit(CallEvent::StatusChanged { from, to: next });
            }
            Ok(_) => {}
            Err(err) => error!("Rejected transition: {}", err),
        }
    }

    fn close_down(&mut self) {
        if self.status.is_active() {
            self.finish_call(Trigger::Hangup, EndReason::Shutdown);
        } else if let Some(pending) = self.pending.take() {
            self.attempt += 1;
            self.cancel(pending);
        }
        self.signaling_ready = false;
        self.publish();

        info!("Releasing signaling address {}", self.local_identity);
        self.endpoint.teardown();
    }

    /// Publishes first so a caller woken by the reply sees the new snapshot.
    fn reply<T>(&self, reply: oneshot::Sender<T>, value: T) {
        self.publish();
        let _ = reply.send(value);
    }

    fn respond(&self, reply: Option<Reply<()>>, result: Result<(), CallSessionError>) {
        if let Some(reply) = reply {
            self.reply(reply, result);
        }
    }

    fn cancel(&self, pending: Pending) {
        self.respond(pending.into_reply(), Err(CallSessionError::Cancelled));
    }

    fn emit(&self, event: CallEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        let next = CallSnapshot {
            local_identity: self.local_identity.clone(),
            signaling_ready: self.signaling_ready,
            status: self.status,
            remote_identity: self.remote_identity.clone(),
            local_stream: self.local_stream.clone(),
            remote_stream: self.remote_stream.clone(),
            muted: self.muted,
            video_hidden: self.video_hidden,
        };
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
