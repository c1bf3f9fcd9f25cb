//! Encoders for values, messages and bundles.
//!
//! Everything appends to a caller-owned `Vec<u8>`, so a sender can keep one
//! scratch buffer alive and serialize without allocating per packet.

use osclink_types::{Bundle, Message, Packet, Timestamp, Value};

use crate::error::EncodeError;

const BUNDLE_MARKER: &[u8; 8] = b"#bundle\0";

/// Encoded size of a string of `len` bytes: terminator plus padding to 4.
pub const fn string_aligned_size(len: usize) -> usize {
    (len + 4) & !3
}

/// Encoded size of `len` blob bytes (length prefix excluded): padding to 4.
pub const fn blob_aligned_size(len: usize) -> usize {
    (len + 3) & !3
}

fn pad_to(out: &mut Vec<u8>, written: usize, aligned: usize) {
    out.resize(out.len() + (aligned - written), 0);
}

fn length_prefix(len: usize) -> Result<[u8; 4], EncodeError> {
    i32::try_from(len)
        .map(i32::to_be_bytes)
        .map_err(|_| EncodeError::TooLarge { len })
}

pub fn write_int(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_float(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_timetag(out: &mut Vec<u8>, value: Timestamp) {
    out.extend_from_slice(&value.raw().to_be_bytes());
}

pub fn write_string(out: &mut Vec<u8>, value: &str) -> Result<(), EncodeError> {
    let bytes = value.as_bytes();
    if bytes.contains(&0) {
        return Err(EncodeError::InteriorNul);
    }
    out.extend_from_slice(bytes);
    pad_to(out, bytes.len(), string_aligned_size(bytes.len()));
    Ok(())
}

pub fn write_blob(out: &mut Vec<u8>, data: &[u8]) -> Result<(), EncodeError> {
    out.extend_from_slice(&length_prefix(data.len())?);
    out.extend_from_slice(data);
    pad_to(out, data.len(), blob_aligned_size(data.len()));
    Ok(())
}

/// Payload bytes of one value. Booleans have none: the tag carries the bit.
///
/// `Invalid` is reported at index 0; [`write_message`] reports the real index.
pub fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Int(v) => write_int(out, *v),
        Value::Float(v) => write_float(out, *v),
        Value::String(v) => write_string(out, v)?,
        Value::Blob(v) => write_blob(out, v)?,
        Value::Bool(_) => {}
        Value::Invalid => return Err(EncodeError::InvalidValue { index: 0 }),
    }
    Ok(())
}

/// Address, type-tag string, then payloads.
pub fn write_message(out: &mut Vec<u8>, msg: &Message) -> Result<(), EncodeError> {
    write_string(out, msg.address())?;

    out.push(b',');
    for (index, value) in msg.values().iter().enumerate() {
        let tag = value.type_tag().ok_or(EncodeError::InvalidValue { index })?;
        out.push(tag);
    }
    let tags_len = msg.values().len() + 1;
    pad_to(out, tags_len, string_aligned_size(tags_len));

    for value in msg.values() {
        write_value(out, value)?;
    }
    Ok(())
}

/// `#bundle\0`, the time tag, then each element behind an int32 length.
///
/// Element lengths are back-patched once the element is written.
pub fn write_bundle(out: &mut Vec<u8>, bundle: &Bundle) -> Result<(), EncodeError> {
    out.extend_from_slice(BUNDLE_MARKER);
    write_timetag(out, bundle.timestamp());

    for element in bundle.elements() {
        let prefix_at = out.len();
        out.extend_from_slice(&[0; 4]);
        write_element(out, element)?;
        let len = out.len() - prefix_at - 4;
        out[prefix_at..prefix_at + 4].copy_from_slice(&length_prefix(len)?);
    }
    Ok(())
}

fn write_element(out: &mut Vec<u8>, packet: &Packet) -> Result<(), EncodeError> {
    match packet {
        Packet::Message(msg) => write_message(out, msg),
        Packet::Bundle(bundle) => write_bundle(out, bundle),
    }
}

/// Serialize a packet. On error `out` is truncated back to its prior length.
pub fn write_packet(out: &mut Vec<u8>, packet: &Packet) -> Result<(), EncodeError> {
    let start = out.len();
    let result = write_element(out, packet);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

/// Serialize a packet into a fresh buffer.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    write_packet(&mut out, packet)?;
    Ok(out)
}

/// Serialize a single message into a fresh buffer.
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    write_message(&mut out, msg)?;
    Ok(out)
}
