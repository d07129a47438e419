//! Virtual connection channel.
//!
//! Purely declarative: CONNECT/CLOSE are one-way announcements and the
//! device is the actual owner of connection state.

use castv2_core::protocol::payload::{self, ConnectionCommand};
use castv2_core::protocol::NS_CONNECTION;
use castv2_core::Result;

use crate::transport::Link;

use super::Controller;

#[derive(Clone)]
pub struct Connection {
    ctl: Controller,
}

impl Connection {
    pub fn new(
        link: Link,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
    ) -> Self {
        Self {
            ctl: Controller::new(link, source_id, destination_id, NS_CONNECTION),
        }
    }

    pub async fn connect(&self) -> Result<()> {
        self.ctl.send(payload::to_json(&ConnectionCommand::Connect)?).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.ctl.send(payload::to_json(&ConnectionCommand::Close)?).await
    }
}
