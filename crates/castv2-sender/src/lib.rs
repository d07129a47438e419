//! castv2 sender engine.
//!
//! This crate wires the TLS transport, namespace router, controller
//! hierarchy, and platform orchestrator into a working CASTV2 sender. It is
//! intended to be consumed through the `castv2` facade crate and by
//! integration tests.

pub mod config;
pub mod controller;
pub mod platform;
pub mod router;
pub mod transport;
