//! Sender config (strict parsing).
//!
//! The engine holds no process-wide state: everything timing-related is
//! carried in an explicit `SenderConfig` handed to the entry functions.

use std::fs;
use std::time::Duration;

use serde::Deserialize;

use castv2_core::{CastError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SenderConfig {
    /// Device control port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// TCP connect bound.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Wait bound for every correlated request; expiry surfaces as
    /// `CastError::Timeout` instead of an indefinite silent wait.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Keep-alive PING period.
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,

    /// Fire-and-forget delay after STOP; the device sends no acknowledgment.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Length-prefix sanity bound; larger frames are treated as corruption.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(100..=120_000).contains(&self.request_timeout_ms) {
            return Err(CastError::Config(
                "request_timeout_ms must be between 100 and 120000".into(),
            ));
        }
        if !(1_000..=60_000).contains(&self.keepalive_interval_ms) {
            return Err(CastError::Config(
                "keepalive_interval_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(1_000..=60_000).contains(&self.connect_timeout_ms) {
            return Err(CastError::Config(
                "connect_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if self.max_frame_len < 1_024 {
            return Err(CastError::Config("max_frame_len must be at least 1024".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

fn default_port() -> u16 {
    castv2_core::device::DEFAULT_PORT
}
fn default_connect_timeout_ms() -> u64 {
    6_000
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_keepalive_interval_ms() -> u64 {
    5_000
}
fn default_stop_grace_ms() -> u64 {
    1_000
}
fn default_max_frame_len() -> usize {
    castv2_core::protocol::framing::DEFAULT_MAX_FRAME_LEN
}

pub fn load_from_file(path: &str) -> Result<SenderConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| CastError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SenderConfig> {
    let cfg: SenderConfig =
        serde_yaml::from_str(s).map_err(|e| CastError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
