// libs/call-session-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::Identity;

use crate::services::media::MediaStream;

// ==============================================================================
// CALL SESSION DOMAIN MODELS
// ==============================================================================

/// Status of the single call session a manager owns.
///
/// `Idle` is both the initial state and the state every call returns to,
/// so one manager can place and receive any number of calls in sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "outgoing")]
    Outgoing,       // Local media acquired, waiting for the callee
    #[serde(rename = "incoming")]
    Incoming,       // Remote party is ringing us
    #[serde(rename = "connected")]
    Connected,      // Remote media flowing
}

impl CallStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, CallStatus::Idle)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CallStatus::Idle => "idle",
            CallStatus::Outgoing => "outgoing",
            CallStatus::Incoming => "incoming",
            CallStatus::Connected => "connected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallDirection {
    #[serde(rename = "outgoing")]
    Outgoing,
    #[serde(rename = "incoming")]
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    #[serde(rename = "local_hangup")]
    LocalHangup,
    #[serde(rename = "remote_hangup")]
    RemoteHangup,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "ring_timeout")]
    RingTimeout,
    #[serde(rename = "signaling_failure")]
    SignalingFailure,
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Record of one finished call attempt, emitted with `CallEvent::Ended`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub remote: Identity,
    pub direction: CallDirection,
    pub started_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: Option<i64>,  // Only for calls that reached Connected
    pub reason: EndReason,
}

impl CallSummary {
    pub fn was_connected(&self) -> bool {
        self.connected_at.is_some()
    }
}

/// Everything the presentation layer renders, published on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSnapshot {
    pub local_identity: Identity,
    pub signaling_ready: bool,
    pub status: CallStatus,
    pub remote_identity: Option<Identity>,
    pub local_stream: Option<MediaStream>,
    pub remote_stream: Option<MediaStream>,
    pub muted: bool,
    pub video_hidden: bool,
}

impl CallSnapshot {
    pub fn idle(local_identity: Identity) -> Self {
        Self {
            local_identity,
            signaling_ready: false,
            status: CallStatus::Idle,
            remote_identity: None,
            local_stream: None,
            remote_stream: None,
            muted: false,
            video_hidden: false,
        }
    }
}

/// Discrete notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Ready { identity: Identity },
    StatusChanged { from: CallStatus, to: CallStatus },
    IncomingCall { from: Identity },
    BusyRejected { from: Identity },
    Ended(CallSummary),
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialization() {
        assert_eq!(serde_json::to_string(&CallStatus::Idle).unwrap(), "\"idle\"");
        assert_eq!(serde_json::to_string(&CallStatus::Connected).unwrap(), "\"connected\"");
        assert_eq!(CallStatus::Outgoing.to_string(), "outgoing");
    }

    #[test]
    fn only_idle_is_inactive() {
        assert!(!CallStatus::Idle.is_active());
        assert!(CallStatus::Outgoing.is_active());
        assert!(CallStatus::Incoming.is_active());
        assert!(CallStatus::Connected.is_active());
    }

    #[test]
    fn idle_snapshot_has_no_media() {
        let snapshot = CallSnapshot::idle(Identity::new("patient-1").unwrap());
        assert_eq!(snapshot.status, CallStatus::Idle);
        assert!(snapshot.local_stream.is_none());
        assert!(snapshot.remote_stream.is_none());
        assert!(!snapshot.muted && !snapshot.video_hidden);
    }

    #[test]
    fn summary_serializes_reason() {
        let now = Utc::now();
        let summary = CallSummary {
            remote: Identity::new("doctor-42").unwrap(),
            direction: CallDirection::Outgoing,
            started_at: now,
            connected_at: None,
            ended_at: now,
            duration_seconds: None,
            reason: EndReason::RingTimeout,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["reason"], "ring_timeout");
        assert_eq!(json["remote"], "doctor-42");
        assert!(!summary.was_connected());
    }
}
