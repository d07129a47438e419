//! Cast target record, as produced by a discovery collaborator.

use serde::Deserialize;

/// Default CASTV2 control port.
pub const DEFAULT_PORT: u16 = 8009;

/// One discovered cast device. The engine takes this as its connection
/// target and has no opinion on how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Device {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Device {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
