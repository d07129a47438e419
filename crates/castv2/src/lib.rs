//! Top-level facade crate for the castv2 sender engine.
//!
//! Re-exports the wire contracts and the runtime so users can depend on a
//! single crate.

pub mod core {
    pub use castv2_core::*;
}

pub mod sender {
    pub use castv2_sender::*;
}

pub use castv2_core::device::Device;
pub use castv2_core::{CastError, Result};
pub use castv2_sender::config::SenderConfig;
pub use castv2_sender::platform::{AppKind, Application, Platform};
