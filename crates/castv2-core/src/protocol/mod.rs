//! CASTV2 protocol contracts.
//!
//! This module hosts the wire layers, bottom up:
//! - `wire`: CastMessage protobuf body encode/decode.
//! - `framing`: 4-byte big-endian length prefix and read buffering.
//! - `envelope`: the decoded logical message.
//! - `payload`: typed JSON payload unions per namespace.
//!
//! All parsers are panic-free: malformed input is reported as `CastError`
//! instead of panicking or indexing raw buffers.

pub mod envelope;
pub mod framing;
pub mod payload;
pub mod wire;

/// Keep-alive channel.
pub const NS_HEARTBEAT: &str = "urn:x-cast:com.google.cast.tp.heartbeat";
/// Virtual connection channel.
pub const NS_CONNECTION: &str = "urn:x-cast:com.google.cast.tp.connection";
/// Receiver application/session management channel.
pub const NS_RECEIVER: &str = "urn:x-cast:com.google.cast.receiver";
/// Media playback channel.
pub const NS_MEDIA: &str = "urn:x-cast:com.google.cast.media";

/// Destination id addressing every subscriber on a namespace.
pub const BROADCAST_ID: &str = "*";
