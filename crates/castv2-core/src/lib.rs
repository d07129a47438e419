//! castv2 core: transport-agnostic CASTV2 wire contracts.
//!
//! This crate defines the frame/envelope codecs, typed payload contracts,
//! and error surface shared by the sender engine and any tooling built on
//! top of it. It intentionally carries no socket or runtime dependencies so
//! it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `CastError`/`Result` so a single
//! malformed message from a device can never crash the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod device;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{CastError, Result};
