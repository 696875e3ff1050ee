use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use shared_models::IdentityError;

use crate::models::CallStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceErrorKind {
    #[serde(rename = "permission_denied")]
    PermissionDenied,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "busy")]
    Busy,
    #[serde(rename = "other")]
    Other,
}

impl fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceErrorKind::PermissionDenied => "permission denied",
            DeviceErrorKind::NotFound => "no device",
            DeviceErrorKind::Busy => "device busy",
            DeviceErrorKind::Other => "device failure",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalingErrorKind {
    #[serde(rename = "address_conflict")]
    AddressConflict,
    #[serde(rename = "network_unreachable")]
    NetworkUnreachable,
    #[serde(rename = "remote_unreachable")]
    RemoteUnreachable,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "closed")]
    Closed,
}

impl fmt::Display for SignalingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalingErrorKind::AddressConflict => "address conflict",
            SignalingErrorKind::NetworkUnreachable => "network unreachable",
            SignalingErrorKind::RemoteUnreachable => "remote unreachable",
            SignalingErrorKind::Timeout => "timeout",
            SignalingErrorKind::Closed => "call closed",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallSessionError {
    #[error("Media device error ({kind}): {message}")]
    Device { kind: DeviceErrorKind, message: String },

    #[error("Signaling error ({kind}): {message}")]
    Signaling { kind: SignalingErrorKind, message: String },

    #[error("Operation {operation} is not allowed while the call is {status}")]
    InvalidState { operation: &'static str, status: CallStatus },

    #[error("Call attempt was cancelled before it completed")]
    Cancelled,

    #[error("Call session manager has shut down")]
    SessionClosed,

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CallSessionError {
    pub fn device(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        CallSessionError::Device {
            kind,
            message: message.into(),
        }
    }

    pub fn signaling(kind: SignalingErrorKind, message: impl Into<String>) -> Self {
        CallSessionError::Signaling {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_state(operation: &'static str, status: CallStatus) -> Self {
        CallSessionError::InvalidState { operation, status }
    }

    /// Device and signaling failures are recoverable: the user may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CallSessionError::Device { .. } | CallSessionError::Signaling { .. }
        )
    }
}

impl From<IdentityError> for CallSessionError {
    fn from(err: IdentityError) -> Self {
        CallSessionError::Configuration {
            message: err.to_string(),
        }
    }
}
