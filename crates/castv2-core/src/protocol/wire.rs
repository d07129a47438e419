//! CastMessage protobuf body codec (panic-free).
//!
//! The device speaks protobuf-encoded CastMessage records:
//! 1 `protocol_version` (varint, always 0 = CASTV2_1_0), 2 `source_id`,
//! 3 `destination_id`, 4 `namespace` (strings), 5 `payload_type` (varint,
//! 0 = STRING, 1 = BINARY), 6 `payload_utf8` (string), 7 `payload_binary`
//! (bytes). This engine produces and consumes STRING payloads only.
//!
//! Parsing rules:
//! - Never index (`buf[0]`) — always use `Buf` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.
//! - Unknown fields are skipped so firmware additions do not break us.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::error::{CastError, Result};
use crate::protocol::envelope::Envelope;

/// CASTV2_1_0, the only protocol version in use.
pub const PROTOCOL_VERSION: u64 = 0;

const PAYLOAD_STRING: u64 = 0;
const PAYLOAD_BINARY: u64 = 1;

const FIELD_PROTOCOL_VERSION: u32 = 1;
const FIELD_SOURCE_ID: u32 = 2;
const FIELD_DESTINATION_ID: u32 = 3;
const FIELD_NAMESPACE: u32 = 4;
const FIELD_PAYLOAD_TYPE: u32 = 5;
const FIELD_PAYLOAD_UTF8: u32 = 6;
const FIELD_PAYLOAD_BINARY: u32 = 7;

const WIRE_VARINT: u8 = 0;
const WIRE_LEN: u8 = 2;

/// Serialize an envelope to a CastMessage body (no length prefix).
/// Fails only when the payload cannot be rendered as JSON text.
pub fn encode_envelope(env: &Envelope) -> Result<Bytes> {
    let text = serde_json::to_string(&env.payload)
        .map_err(|e| CastError::Payload(format!("payload not serializable: {e}")))?;

    let mut buf = BytesMut::with_capacity(
        32 + env.source_id.len() + env.destination_id.len() + env.namespace.len() + text.len(),
    );
    put_varint_field(&mut buf, FIELD_PROTOCOL_VERSION, PROTOCOL_VERSION);
    put_string_field(&mut buf, FIELD_SOURCE_ID, &env.source_id);
    put_string_field(&mut buf, FIELD_DESTINATION_ID, &env.destination_id);
    put_string_field(&mut buf, FIELD_NAMESPACE, &env.namespace);
    put_varint_field(&mut buf, FIELD_PAYLOAD_TYPE, PAYLOAD_STRING);
    put_string_field(&mut buf, FIELD_PAYLOAD_UTF8, &text);
    Ok(buf.freeze())
}

/// Parse a CastMessage body into an envelope.
///
/// `CastError::Frame` means the body itself is malformed (connection-fatal);
/// `CastError::Payload` means the body parsed but the payload is unusable
/// (drop the envelope, keep the connection).
pub fn decode_envelope(mut buf: Bytes) -> Result<Envelope> {
    let mut source_id: Option<String> = None;
    let mut destination_id: Option<String> = None;
    let mut namespace: Option<String> = None;
    let mut payload_type: Option<u64> = None;
    let mut payload_utf8: Option<String> = None;

    while buf.has_remaining() {
        let key = get_varint(&mut buf)?;
        let field = (key >> 3) as u32;
        let wire = (key & 0x07) as u8;
        match (field, wire) {
            (FIELD_PROTOCOL_VERSION, WIRE_VARINT) => {
                // Accepted regardless of value; there is only one version.
                let _ = get_varint(&mut buf)?;
            }
            (FIELD_PAYLOAD_TYPE, WIRE_VARINT) => payload_type = Some(get_varint(&mut buf)?),
            (FIELD_SOURCE_ID, WIRE_LEN) => source_id = Some(get_string(&mut buf)?),
            (FIELD_DESTINATION_ID, WIRE_LEN) => destination_id = Some(get_string(&mut buf)?),
            (FIELD_NAMESPACE, WIRE_LEN) => namespace = Some(get_string(&mut buf)?),
            (FIELD_PAYLOAD_UTF8, WIRE_LEN) => payload_utf8 = Some(get_string(&mut buf)?),
            (FIELD_PAYLOAD_BINARY, WIRE_LEN) => {
                let _ = get_len_delimited(&mut buf)?;
            }
            (_, WIRE_VARINT) => {
                let _ = get_varint(&mut buf)?;
            }
            (_, WIRE_LEN) => {
                let _ = get_len_delimited(&mut buf)?;
            }
            (field, wire) => {
                return Err(CastError::Frame(format!(
                    "unsupported wire type {wire} for field {field}"
                )))
            }
        }
    }

    let source_id = source_id.ok_or_else(|| CastError::Frame("missing source_id".into()))?;
    let destination_id =
        destination_id.ok_or_else(|| CastError::Frame("missing destination_id".into()))?;
    let namespace = namespace.ok_or_else(|| CastError::Frame("missing namespace".into()))?;
    let payload_type =
        payload_type.ok_or_else(|| CastError::Frame("missing payload_type".into()))?;

    match payload_type {
        PAYLOAD_STRING => {
            let text =
                payload_utf8.ok_or_else(|| CastError::Frame("missing payload_utf8".into()))?;
            let payload: Value = serde_json::from_str(&text)
                .map_err(|e| CastError::Payload(format!("payload is not valid json: {e}")))?;
            Ok(Envelope {
                source_id,
                destination_id,
                namespace,
                payload,
            })
        }
        PAYLOAD_BINARY => Err(CastError::Payload(
            "binary payloads are not supported".into(),
        )),
        other => Err(CastError::Frame(format!("unknown payload type {other}"))),
    }
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

fn put_varint_field(buf: &mut BytesMut, field: u32, value: u64) {
    put_varint(buf, (u64::from(field) << 3) | u64::from(WIRE_VARINT));
    put_varint(buf, value);
}

fn put_string_field(buf: &mut BytesMut, field: u32, value: &str) {
    put_varint(buf, (u64::from(field) << 3) | u64::from(WIRE_LEN));
    put_varint(buf, value.len() as u64);
    buf.put_slice(value.as_bytes());
}

fn get_varint(buf: &mut Bytes) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CastError::Frame("truncated varint".into()));
        }
        let byte = buf.get_u8();
        if shift >= 64 {
            return Err(CastError::Frame("varint overflows u64".into()));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn get_len_delimited(buf: &mut Bytes) -> Result<Bytes> {
    let len = get_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| CastError::Frame("field length overflow".into()))?;
    if buf.remaining() < len {
        return Err(CastError::Frame(format!(
            "field declares {len} bytes, {} available",
            buf.remaining()
        )));
    }
    Ok(buf.copy_to_bytes(len))
}

fn get_string(buf: &mut Bytes) -> Result<String> {
    let raw = get_len_delimited(buf)?;
    String::from_utf8(raw.to_vec()).map_err(|e| CastError::Frame(format!("invalid utf-8: {e}")))
}
