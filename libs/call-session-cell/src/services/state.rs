// libs/call-session-cell/src/services/state.rs
use serde::{Deserialize, Serialize};

use crate::error::CallSessionError;
use crate::models::CallStatus;

/// Everything that can move the call status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Local media acquired and the offer sent.
    PlaceCall,
    IncomingCall,
    /// Answer intent; legal only while ringing, does not change status.
    Answer,
    RemoteStream,
    Reject,
    Hangup,
    RemoteHangup,
    RingTimeout,
    Failure,
}

impl Trigger {
    pub fn operation(&self) -> &'static str {
        match self {
            Trigger::PlaceCall => "start_outgoing",
            Trigger::IncomingCall => "incoming_call",
            Trigger::Answer => "answer",
            Trigger::RemoteStream => "remote_stream",
            Trigger::Reject => "reject",
            Trigger::Hangup => "end_call",
            Trigger::RemoteHangup => "remote_hangup",
            Trigger::RingTimeout => "ring_timeout",
            Trigger::Failure => "failure",
        }
    }
}

impl CallStatus {
    /// The complete transition table. Anything not listed is an
    /// `InvalidState` error and leaves the status untouched.
    pub fn apply(self, trigger: Trigger) -> Result<CallStatus, CallSessionError> {
        use CallStatus::*;
        use Trigger::*;

        match (self, trigger) {
            (Idle, PlaceCall) => Ok(Outgoing),
            (Idle, IncomingCall) => Ok(Incoming),

            (Outgoing, RemoteStream) => Ok(Connected),
            (Outgoing, Hangup | RemoteHangup | RingTimeout | Failure) => Ok(Idle),

            (Incoming, Answer) => Ok(Incoming),
            (Incoming, RemoteStream) => Ok(Connected),
            (Incoming, Reject | Hangup | RemoteHangup | Failure) => Ok(Idle),

            (Connected, Hangup | RemoteHangup | Failure) => Ok(Idle),

            (status, trigger) => Err(CallSessionError::invalid_state(trigger.operation(), status)),
        }
    }

    pub fn permits(self, trigger: Trigger) -> bool {
        self.apply(trigger).is_ok()
    }
}
