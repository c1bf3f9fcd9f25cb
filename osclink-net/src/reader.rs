//! Decode primitives for the OSC 1.0 binary layout.
//!
//! Every primitive reads from `buf` starting at `*pos` and advances `pos`
//! past the field (including padding). The slice end is the hard bound: the
//! parser hands each packet or bundle element over as its own sub-slice, so
//! padding is relative to that element's first byte. On error `pos` is left
//! where it was.

use std::borrow::Cow;

use osclink_types::Timestamp;

use crate::error::DecodeError;
use crate::writer::{blob_aligned_size, string_aligned_size};

/// First string of every bundle.
pub const BUNDLE_TAG: &str = "#bundle";

fn take<const N: usize>(buf: &[u8], pos: &mut usize) -> Result<[u8; N], DecodeError> {
    let start = *pos;
    let chunk = buf
        .get(start..)
        .and_then(|rest| rest.first_chunk::<N>())
        .ok_or(DecodeError::Truncated {
            at: start,
            needed: N,
            available: buf.len().saturating_sub(start),
        })?;
    *pos = start + N;
    Ok(*chunk)
}

/// NUL-terminated UTF-8 string, padded to a multiple of 4 bytes.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn read_string<'a>(buf: &'a [u8], pos: &mut usize) -> Result<Cow<'a, str>, DecodeError> {
    let start = *pos;
    let rest = buf.get(start..).unwrap_or_default();
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::MissingTerminator { at: start })?;

    let padded = string_aligned_size(len);
    if padded > rest.len() {
        return Err(DecodeError::Truncated {
            at: start,
            needed: padded,
            available: rest.len(),
        });
    }

    *pos = start + padded;
    Ok(String::from_utf8_lossy(&rest[..len]))
}

pub fn read_int(buf: &[u8], pos: &mut usize) -> Result<i32, DecodeError> {
    take::<4>(buf, pos).map(i32::from_be_bytes)
}

pub fn read_float(buf: &[u8], pos: &mut usize) -> Result<f32, DecodeError> {
    take::<4>(buf, pos).map(f32::from_be_bytes)
}

/// int32 length, the bytes, then padding to a multiple of 4.
pub fn read_blob<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], DecodeError> {
    let start = *pos;
    let mut cursor = start;
    let len = read_int(buf, &mut cursor)?;
    if len < 0 {
        return Err(DecodeError::NegativeLength { at: start, len });
    }

    let len = len as usize;
    let padded = blob_aligned_size(len);
    let available = buf.len().saturating_sub(cursor);
    if padded > available {
        return Err(DecodeError::Truncated {
            at: cursor,
            needed: padded,
            available,
        });
    }

    let data = &buf[cursor..cursor + len];
    *pos = cursor + padded;
    Ok(data)
}

/// 8-byte NTP64 time tag.
pub fn read_timetag(buf: &[u8], pos: &mut usize) -> Result<Timestamp, DecodeError> {
    take::<8>(buf, pos).map(|bytes| Timestamp::from_raw(u64::from_be_bytes(bytes)))
}
