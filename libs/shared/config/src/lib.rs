use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_RING_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_BUFFER: usize = 32;
const DEFAULT_EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct CallConfig {
    pub local_identity: String,
    pub auto_dial: Option<String>,
    pub ring_timeout_secs: u64,
    pub media_audio: bool,
    pub media_video: bool,
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            local_identity: String::new(),
            auto_dial: None,
            ring_timeout_secs: DEFAULT_RING_TIMEOUT_SECS,
            media_audio: true,
            media_video: true,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl CallConfig {
    pub fn from_env() -> Self {
        let config = Self {
            local_identity: env::var("CALL_LOCAL_IDENTITY")
                .unwrap_or_else(|_| {
                    warn!("CALL_LOCAL_IDENTITY not set, using empty value");
                    String::new()
                }),
            auto_dial: env::var("CALL_AUTO_DIAL")
                .ok()
                .filter(|remote| !remote.trim().is_empty()),
            ring_timeout_secs: parse_or("CALL_RING_TIMEOUT_SECS", DEFAULT_RING_TIMEOUT_SECS),
            media_audio: parse_or("CALL_MEDIA_AUDIO", true),
            media_video: parse_or("CALL_MEDIA_VIDEO", true),
            command_buffer: parse_or("CALL_COMMAND_BUFFER", DEFAULT_COMMAND_BUFFER),
            event_buffer: parse_or("CALL_EVENT_BUFFER", DEFAULT_EVENT_BUFFER),
        };

        if !config.is_configured() {
            warn!("Call session not fully configured - missing CALL_LOCAL_IDENTITY");
        }

        config
    }

    /// Same settings, bound to another local identity.
    pub fn for_identity(&self, identity: impl Into<String>) -> Self {
        Self {
            local_identity: identity.into(),
            ..self.clone()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.local_identity.trim().is_empty()
    }

    pub fn ring_timeout(&self) -> Duration {
        Duration::from_secs(self.ring_timeout_secs)
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
