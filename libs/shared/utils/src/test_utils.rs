use uuid::Uuid;

use shared_config::CallConfig;
use shared_models::{Identity, ParticipantRole};

pub struct TestConfig {
    pub ring_timeout_secs: u64,
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            ring_timeout_secs: 30,
            command_buffer: 16,
            event_buffer: 64,
        }
    }
}

impl TestConfig {
    pub fn to_call_config(&self, identity: &Identity) -> CallConfig {
        CallConfig {
            local_identity: identity.to_string(),
            auto_dial: None,
            ring_timeout_secs: self.ring_timeout_secs,
            media_audio: true,
            media_video: true,
            command_buffer: self.command_buffer,
            event_buffer: self.event_buffer,
        }
    }
}

pub struct TestParticipant {
    pub identity: Identity,
    pub role: ParticipantRole,
}

impl TestParticipant {
    pub fn new(prefix: &str, role: ParticipantRole) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let identity = Identity::new(format!("{}-{}", prefix, &suffix[..8]))
            .unwrap_or_else(|err| panic!("test identity must be valid: {}", err));
        Self { identity, role }
    }

    pub fn doctor() -> Self {
        Self::new("doctor", ParticipantRole::Doctor)
    }

    pub fn patient() -> Self {
        Self::new("patient", ParticipantRole::Patient)
    }

    pub fn config(&self) -> CallConfig {
        TestConfig::default().to_call_config(&self.identity)
    }
}

pub fn identity(raw: &str) -> Identity {
    Identity::new(raw).unwrap_or_else(|err| panic!("invalid test identity {:?}: {}", raw, err))
}
